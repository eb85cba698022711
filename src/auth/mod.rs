use crate::core::models::{ApiScope, Client, IdentityResource, PersistedGrant, Resources};
use crate::core::types::{ClientId, ClientSecret, GrantHandle, RedirectUri, Scope};
use crate::provider::error::Error;

pub mod authorization;
pub mod access_token;
pub mod error;
pub mod pkce;
pub mod revocation;

pub use authorization::*;
pub use access_token::*;
pub use error::ErrorResponse;

use async_trait::async_trait;

#[derive(Debug)]
pub enum MaybeRedirect<R, D> {
    Redirected(Redirect<R>),
    Direct(D),
}

#[derive(Debug, Clone)]
#[derive(serde::Serialize)]
pub struct WithState<T> {
    #[serde(flatten)]
    pub inner: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl<T> From<(T, Option<String>)> for WithState<T> {
    fn from((t, state): (T, Option<String>)) -> Self {
        Self { inner: t, state }
    }
}

#[derive(Debug, Clone)]
#[derive(serde::Deserialize)]
pub struct ClientCredentials {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
}

/// End-user credentials handed to the identity provider. The provider core
/// never keeps them past the authentication call.
#[derive(Clone)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Redirect<T> {
    pub uri: RedirectUri,
    pub params: T,
}

impl<T> Redirect<T> {
    pub fn new(uri: RedirectUri, params: T) -> Self {
        Redirect { uri, params }
    }
}

/// Outcome of an idempotent seed-time write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

/// Static client, identity-resource and API-scope definitions.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_client(&self, client_id: &ClientId) -> Result<Client, Error>;
    /// Fails with [`Error::ConfigNotFound`] naming every unknown scope when
    /// any of `names` is undefined.
    async fn get_scopes(&self, names: &Scope) -> Result<Resources, Error>;
    async fn list_clients(&self) -> Result<Vec<Client>, Error>;
    async fn list_resources(&self) -> Result<Resources, Error>;
    async fn upsert_client(&self, client: &Client) -> Result<Upsert, Error>;
    async fn upsert_identity_resource(&self, resource: &IdentityResource) -> Result<Upsert, Error>;
    async fn upsert_api_scope(&self, scope: &ApiScope) -> Result<Upsert, Error>;
}

/// Issued authorization codes and refresh tokens.
///
/// Every method must be safe to call concurrently; `atomic_consume` is the
/// only place a grant moves from unconsumed to consumed.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn put(&self, grant: &PersistedGrant) -> Result<(), Error>;
    async fn get(&self, handle: &GrantHandle) -> Result<Option<PersistedGrant>, Error>;
    /// True iff this call moved the grant from unconsumed to consumed.
    /// Revoked grants are never consumed.
    async fn atomic_consume(&self, handle: &GrantHandle) -> Result<bool, Error>;
    async fn revoke(&self, handle: &GrantHandle) -> Result<(), Error>;
    /// Revokes every grant issued under the authorization code `origin`.
    async fn revoke_family(&self, origin: &GrantHandle) -> Result<u64, Error>;
    async fn revoke_all_for_subject(&self, subject: &str, client_id: &ClientId) -> Result<u64, Error>;
    /// Drops expired grants, except those still named as `origin` by a live
    /// grant: a replayed code must be found to revoke its family.
    async fn remove_expired(&self, now: i64) -> Result<u64, Error>;
}

impl Resources {
    /// Errors unless every name in `requested` is defined in `self`.
    pub fn ensure_covers(&self, requested: &Scope) -> Result<(), Error> {
        let missing = requested.difference(&self.names());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigNotFound(format!("scope {}", missing)))
        }
    }
}
