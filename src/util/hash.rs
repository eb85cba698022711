use crate::core::types::{AuthCode, ClientSecret, GrantHandle, HashedClientSecret, RefreshToken};
use crate::provider::error::Error;

use super::random::FromRandom;

#[derive(Debug)]
pub struct Salt(pub String);

#[derive(Clone)]
pub struct HashingService {
    secret_key: String,
}

impl std::fmt::Debug for HashingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashingService {{ ... }}")
    }
}

pub trait HashTo: AsRef<str> {
    type HashedType;
}

impl HashTo for ClientSecret {
    type HashedType = HashedClientSecret;
}

impl HashTo for AuthCode {
    type HashedType = GrantHandle;
}

impl HashTo for RefreshToken {
    type HashedType = GrantHandle;
}

impl HashingService {
    pub fn with_secret_key(secret_key: String) -> Self {
        Self { secret_key }
    }

    fn get_config(&self) -> argon2::Config<'_> {
        let mut config = argon2::Config::default();
        config.secret = self.secret_key.as_bytes();
        config
    }

    /// Salted argon2 hash in PHC string form.
    pub fn hash<T, H>(&self, to_hash: &T) -> Result<H, Error>
    where
        T: HashTo<HashedType = H>,
        H: From<String>,
    {
        let s = to_hash.as_ref();
        let salt = Salt::from_random();
        let hash = argon2::hash_encoded(s.as_bytes(), salt.0.as_bytes(), &self.get_config())
            .map_err(|_| Error::BadRequest)?;

        Ok(hash.into())
    }

    /// Hashes an arbitrary string, for credentials the provider core has no
    /// type for (operator CLI, identity adapter files).
    pub fn hash_str(&self, to_hash: &str) -> Result<String, Error> {
        let salt = Salt::from_random();
        argon2::hash_encoded(to_hash.as_bytes(), salt.0.as_bytes(), &self.get_config())
            .map_err(|_| Error::BadRequest)
    }

    pub fn verify<T, H>(&self, secret: &T, hashed: &H) -> Result<bool, Error>
    where
        T: HashTo<HashedType = H>,
        H: AsRef<str>,
    {
        self.verify_str(secret.as_ref(), hashed.as_ref())
    }

    pub fn verify_str(&self, secret: &str, hashed: &str) -> Result<bool, Error> {
        argon2::verify_encoded_ext(hashed, secret.as_bytes(), self.secret_key.as_bytes(), &[])
            .map_err(|_| Error::Unauthorized)
    }

    /// Deterministic digest used as a grant-store key.
    pub fn hash_without_salt<T, H>(&self, to_hash: &T) -> H
    where
        T: HashTo<HashedType = H>,
        H: From<String>,
    {
        use sha2::Digest;

        let to_hash = to_hash.as_ref();
        let digest = sha2::Sha512::digest(to_hash.as_bytes());
        let hash = base64::encode_config(digest, base64::URL_SAFE);
        hash.into()
    }
}
