use std::sync::Arc;
use std::time::Duration;

use tracing::{event, Level};

use crate::auth::{
    AccessTokenError, AccessTokenErrorKind, ClientCredentials, ConfigStore, ErrorResponse,
    GrantStore,
};
use crate::core::models::Client;
use crate::core::types::unix_now;
use crate::util::hash::HashingService;

pub mod access_token;
pub mod authorization;
pub mod claims;
pub mod error;
pub mod grant;
pub mod identity;
pub mod keys;
pub mod oidc;
pub mod revocation;
pub mod token;

pub use error::Error;
use identity::IdentityProvider;
use token::TokenService;

const DEFAULT_CODE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub code_ttl: Duration,
    /// Absolute lifetime of a refresh token family, counted from the code
    /// exchange. Rotation does not extend it.
    pub refresh_token_ttl: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            code_ttl: DEFAULT_CODE_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
        }
    }
}

pub struct OAuth2Provider {
    config: Arc<dyn ConfigStore>,
    grants: Arc<dyn GrantStore>,
    identity: Arc<dyn IdentityProvider>,
    token: TokenService,
    hasher: HashingService,
    settings: ProviderSettings,
}

impl std::fmt::Debug for OAuth2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Provider")
            .field("token", &self.token)
            .field("settings", &self.settings)
            .finish()
    }
}

impl OAuth2Provider {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        grants: Arc<dyn GrantStore>,
        identity: Arc<dyn IdentityProvider>,
        token: TokenService,
        hasher: HashingService,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            config,
            grants,
            identity,
            token,
            hasher,
            settings,
        }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.token
    }

    async fn check_client_authentication(
        &self,
        cred: &ClientCredentials,
    ) -> Result<Client, AccessTokenError> {
        let bad_authentication = || {
            ErrorResponse::with_description(
                AccessTokenErrorKind::InvalidClient,
                "Bad authentication",
            )
        };

        let client = match self.config.get_client(&cred.client_id).await {
            Ok(client) => client,
            Err(Error::ConfigNotFound(_)) => return Err(bad_authentication()),
            Err(e) => return Err(e.into()),
        };

        if self
            .hasher
            .verify(&cred.client_secret, &client.secret)
            .unwrap_or(false)
        {
            Ok(client)
        } else {
            event!(Level::INFO, client_id = %cred.client_id, "Failed client authentication");
            Err(bad_authentication())
        }
    }

    /// Periodically drops expired grants. Lookups compare expiry themselves,
    /// so a slow or failing sweep only costs storage.
    pub fn start_clean_up_worker(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let provider = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));

            loop {
                interval.tick().await;
                match provider.grants.remove_expired(unix_now()).await {
                    Ok(0) => {}
                    Ok(removed) => event!(Level::DEBUG, removed, "Removed expired grants"),
                    Err(e) => event!(Level::ERROR, error = %e, "Failed to remove expired grants"),
                }
            }
        })
    }
}
