use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use super::error::Error;

/// Source of the token signing key. Custody and rotation happen outside the
/// provider; a provider that cannot hand out a key fails issuance with
/// [`Error::SignatureKeyUnavailable`].
pub trait KeyProvider: Send + Sync {
    fn algorithm(&self) -> Algorithm;
    fn encoding_key(&self) -> Result<&EncodingKey, Error>;
    fn decoding_key(&self) -> Result<&DecodingKey<'static>, Error>;
}

/// ES256 key pair read from PEM (PKCS#8 private key, SPKI public key).
pub struct PemKeyProvider {
    secret: EncodingKey,
    public: DecodingKey<'static>,
}

impl std::fmt::Debug for PemKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PemKeyProvider {{ ... }}")
    }
}

impl PemKeyProvider {
    pub fn from_pem(secret: &[u8], public: &[u8]) -> Result<Self, Error> {
        let secret = EncodingKey::from_ec_pem(secret)
            .map_err(|e| Error::SignatureKeyUnavailable(e.to_string()))?;
        let public = DecodingKey::from_ec_pem(public)
            .map_err(|e| Error::SignatureKeyUnavailable(e.to_string()))?
            .into_static();

        Ok(Self { secret, public })
    }

    pub fn from_files(secret_path: &str, public_path: &str) -> Result<Self, Error> {
        let secret = std::fs::read(secret_path)
            .map_err(|e| Error::SignatureKeyUnavailable(format!("{}: {}", secret_path, e)))?;
        let public = std::fs::read(public_path)
            .map_err(|e| Error::SignatureKeyUnavailable(format!("{}: {}", public_path, e)))?;

        Self::from_pem(&secret, &public)
    }
}

impl KeyProvider for PemKeyProvider {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ES256
    }

    fn encoding_key(&self) -> Result<&EncodingKey, Error> {
        Ok(&self.secret)
    }

    fn decoding_key(&self) -> Result<&DecodingKey<'static>, Error> {
        Ok(&self.public)
    }
}
