use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{event, Level};

use crate::auth::UserCredentials;
use crate::util::hash::HashingService;

use super::error::Error;

/// The user store the provider authenticates against. It owns subjects and
/// their claims; the provider only ever sees the subject identifier.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, credentials: &UserCredentials) -> Result<String, Error>;
    async fn get_claims(&self, subject: &str) -> Result<Map<String, Value>, Error>;
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StaticUser {
    pub username: String,
    pub subject: String,
    /// argon2 hash produced with the service's hash secret.
    pub password_hash: String,
    #[serde(default)]
    pub claims: Map<String, Value>,
}

/// Fixed user list, read from a JSON file of [`StaticUser`] records.
#[derive(Debug)]
pub struct StaticIdentityProvider {
    users: HashMap<String, StaticUser>,
    hasher: HashingService,
}

impl StaticIdentityProvider {
    pub fn new(users: Vec<StaticUser>, hasher: HashingService) -> Self {
        let users = users.into_iter().map(|u| (u.username.clone(), u)).collect();
        Self { users, hasher }
    }

    pub fn from_file(path: &str, hasher: HashingService) -> Result<Self, Error> {
        let contents = std::fs::read(path)?;
        let users: Vec<StaticUser> = serde_json::from_slice(&contents)?;
        Ok(Self::new(users, hasher))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, credentials: &UserCredentials) -> Result<String, Error> {
        let user = self
            .users
            .get(&credentials.username)
            .ok_or(Error::Unauthorized)?;

        if self
            .hasher
            .verify_str(&credentials.password, &user.password_hash)?
        {
            Ok(user.subject.clone())
        } else {
            event!(Level::INFO, username = %credentials.username, "Failed user authentication");
            Err(Error::Unauthorized)
        }
    }

    async fn get_claims(&self, subject: &str) -> Result<Map<String, Value>, Error> {
        Ok(self
            .users
            .values()
            .find(|u| u.subject == subject)
            .map(|u| u.claims.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn provider() -> StaticIdentityProvider {
        let hasher = HashingService::with_secret_key("pepper".to_string());
        let mut claims = Map::new();
        claims.insert("name".to_string(), Value::from("Alice"));
        let user = StaticUser {
            username: "alice".to_string(),
            subject: "sub-alice".to_string(),
            password_hash: hasher.hash_str("wonderland").unwrap(),
            claims,
        };
        StaticIdentityProvider::new(vec![user], hasher)
    }

    fn credentials(username: &str, password: &str) -> UserCredentials {
        UserCredentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn authenticates_known_user() {
        let provider = provider();
        let subject = provider
            .authenticate(&credentials("alice", "wonderland"))
            .await
            .unwrap();
        assert_eq!(subject, "sub-alice");

        let claims = provider.get_claims(&subject).await.unwrap();
        assert_eq!(claims["name"], "Alice");
    }

    #[tokio::test]
    async fn rejects_bad_password_and_unknown_user() {
        let provider = provider();
        assert!(matches!(
            provider.authenticate(&credentials("alice", "looking-glass")).await,
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            provider.authenticate(&credentials("bob", "wonderland")).await,
            Err(Error::Unauthorized)
        ));
    }
}
