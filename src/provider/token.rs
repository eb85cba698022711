use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Header, Validation};
use serde_json::{Map, Value};
use tracing::{event, Level};

use crate::auth::TokenType;
use crate::core::types::{unix_now, ClientId, Scope, TokenId};
use crate::oidc::types::Nonce;
use crate::provider::{
    claims::{AccessClaims, IdClaims},
    keys::KeyProvider,
    Error,
};
use crate::util::random::FromRandom;

const ID_TOKEN_TTL_SECS: u64 = 60 * 60;

/// What the ID token needs beyond subject, client and scope.
#[derive(Debug, Default)]
pub struct IdTokenContext<'a> {
    pub nonce: Option<&'a Nonce>,
    pub auth_time: i64,
    pub claims: Map<String, Value>,
}

#[derive(Debug)]
pub struct SignedTokens {
    pub access_token: String,
    pub id_token: Option<String>,
    pub expires_in: u64,
}

pub struct TokenService {
    keys: Arc<dyn KeyProvider>,
    issuer: String,
    access_token_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenService {{ issuer: {:?}, ... }}", self.issuer)
    }
}

impl TokenService {
    pub fn new(keys: Arc<dyn KeyProvider>, issuer: String, access_token_ttl: Duration) -> Self {
        Self {
            keys,
            issuer,
            access_token_ttl,
        }
    }

    pub fn token_type() -> TokenType {
        TokenType::Bearer
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> jsonwebtoken::Algorithm {
        self.keys.algorithm()
    }

    fn current_timestamp() -> u64 {
        unix_now() as u64
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.keys.algorithm());
        validation.iss = Some(self.issuer.clone());
        validation
    }

    /// Signs an access token and, when `id_token` is given, an ID token for
    /// the same subject and client.
    #[tracing::instrument(skip(self, scope, id_token), fields(scope = %scope))]
    pub fn issue(
        &self,
        client_id: &ClientId,
        subject: &str,
        scope: &Scope,
        id_token: Option<IdTokenContext<'_>>,
    ) -> Result<SignedTokens, Error> {
        let access_token = self.new_token(client_id, subject, scope)?;
        let id_token = match id_token {
            Some(context) => Some(self.new_id_token(client_id, subject, context)?),
            None => None,
        };

        Ok(SignedTokens {
            access_token,
            id_token,
            expires_in: self.access_token_ttl.as_secs(),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<AccessClaims, Error> {
        let key = self.keys.decoding_key()?;
        jsonwebtoken::decode::<AccessClaims>(token, key, &self.validation())
            .map(|td| td.claims)
            .map_err(|_| Error::Unauthorized)
    }

    /// Verifies signature and issuer of an ID token presented back to us.
    /// Expiry is not checked: logout hints are usually stale.
    pub fn validate_id_token_hint(&self, token: &str) -> Result<IdClaims, Error> {
        let key = self.keys.decoding_key()?;
        let mut validation = self.validation();
        validation.validate_exp = false;
        jsonwebtoken::decode::<IdClaims>(token, key, &validation)
            .map(|td| td.claims)
            .map_err(|_| Error::Unauthorized)
    }

    fn new_token(&self, client_id: &ClientId, subject: &str, scope: &Scope) -> Result<String, Error> {
        let time_now = Self::current_timestamp();
        let expiry = time_now + self.access_token_ttl.as_secs();

        let claims = AccessClaims {
            iss: self.issuer.clone(),
            exp: expiry,
            aud: client_id.0.to_string(),
            sub: subject.to_string(),
            client_id: client_id.0.to_string(),
            iat: time_now,
            nbf: time_now,
            jti: TokenId::from_random(),
            scope: Some(scope.clone()),
        };

        event!(Level::DEBUG, "Issuing access_token");
        self.make_token(claims)
    }

    fn new_id_token(
        &self,
        client_id: &ClientId,
        subject: &str,
        context: IdTokenContext<'_>,
    ) -> Result<String, Error> {
        let time_now = Self::current_timestamp();
        let expiry = time_now + ID_TOKEN_TTL_SECS;

        let claims = IdClaims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: client_id.0.to_string(),
            exp: expiry,
            iat: time_now,
            nbf: time_now,
            auth_time: context.auth_time.max(0) as u64,
            nonce: context.nonce.cloned(),
            azp: client_id.0.to_string(),
            user: context.claims,
        };

        event!(Level::DEBUG, "Issuing id_token");
        self.make_token(claims)
    }

    fn make_token(&self, claims: impl serde::Serialize) -> Result<String, Error> {
        let key = self.keys.encoding_key()?;
        let header = Header::new(self.keys.algorithm());

        jsonwebtoken::encode(&header, &claims, key)
            .map_err(|e| Error::SignatureKeyUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::provider::keys::PemKeyProvider;

    fn service() -> TokenService {
        let keys = PemKeyProvider::from_pem(
            include_bytes!("../../testdata/es256-private.pem"),
            include_bytes!("../../testdata/es256-public.pem"),
        )
        .unwrap();
        TokenService::new(
            Arc::new(keys),
            "https://issuer.example".to_string(),
            Duration::from_secs(900),
        )
    }

    #[test]
    fn access_token_round_trips_claims() {
        let service = service();
        let client = ClientId("c1".to_string());
        let scope = Scope::from_delimited_parts("openid profile");

        let tokens = service.issue(&client, "alice", &scope, None).unwrap();
        assert!(tokens.id_token.is_none());
        assert_eq!(tokens.expires_in, 900);

        let claims = service.validate_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, "c1");
        assert_eq!(claims.iss, "https://issuer.example");
        assert_eq!(claims.scope, Some(scope));
    }

    #[test]
    fn id_token_carries_nonce_and_claims() {
        let service = service();
        let client = ClientId("c1".to_string());
        let nonce = Nonce("n-0S6_WzA2Mj".to_string());
        let mut claims = Map::new();
        claims.insert("email".to_string(), Value::from("alice@example.com"));

        let tokens = service
            .issue(
                &client,
                "alice",
                &Scope::from_delimited_parts("openid"),
                Some(IdTokenContext {
                    nonce: Some(&nonce),
                    auth_time: 1_000,
                    claims,
                }),
            )
            .unwrap();

        let id = service
            .validate_id_token_hint(&tokens.id_token.unwrap())
            .unwrap();
        assert_eq!(id.nonce, Some(nonce));
        assert_eq!(id.azp, "c1");
        assert_eq!(id.auth_time, 1_000);
        assert_eq!(id.user["email"], "alice@example.com");
    }

    #[test]
    fn rejects_token_from_other_issuer() {
        let service = service();
        let other = TokenService::new(
            Arc::clone(&service.keys),
            "https://other.example".to_string(),
            Duration::from_secs(900),
        );
        let tokens = other
            .issue(&ClientId("c1".to_string()), "alice", &Scope::default(), None)
            .unwrap();

        assert!(matches!(
            service.validate_token(&tokens.access_token),
            Err(Error::Unauthorized)
        ));
    }
}
