use std::collections::BTreeSet;
use std::str::FromStr;

use crate::auth::pkce;
use crate::oidc::types::Nonce;

use super::types::*;

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Client {
    #[serde(rename = "client_id")]
    pub id: ClientId,
    #[serde(rename = "client_name", default)]
    pub name: String,
    #[serde(rename = "secret_hash")]
    pub secret: HashedClientSecret,
    #[serde(default)]
    pub allowed_grant_types: BTreeSet<GrantType>,
    #[serde(default)]
    pub redirect_uris: BTreeSet<RedirectUri>,
    #[serde(default)]
    pub post_logout_redirect_uris: BTreeSet<RedirectUri>,
    #[serde(default)]
    pub allowed_scopes: Scope,
    #[serde(default)]
    pub require_consent: bool,
    #[serde(default)]
    pub require_pkce: bool,
    #[serde(default = "enabled")]
    pub rotate_refresh_tokens: bool,
}

impl Client {
    pub fn allows_grant(&self, grant_type: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant_type)
    }

    pub fn has_redirect_uri(&self, uri: &RedirectUri) -> bool {
        self.redirect_uris.contains(uri)
    }

    pub fn has_post_logout_redirect_uri(&self, uri: &RedirectUri) -> bool {
        self.post_logout_redirect_uris.contains(uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct IdentityResource {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Claims released in the ID token when this resource is granted.
    #[serde(default)]
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct ApiScope {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    pub identity: Vec<IdentityResource>,
    pub api: Vec<ApiScope>,
}

impl Resources {
    pub fn names(&self) -> Scope {
        let parts = self
            .identity
            .iter()
            .map(|r| r.name.clone())
            .chain(self.api.iter().map(|s| s.name.clone()))
            .collect();
        Scope::from_parts(parts)
    }

    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.identity
            .iter()
            .flat_map(|r| r.claims.iter().map(AsRef::as_ref))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

impl GrantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(format!("unknown grant kind {}", other)),
        }
    }
}

/// What the end user authorized, carried from the code to every refresh
/// token descending from it.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct GrantData {
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub redirect_uri: Option<RedirectUri>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nonce: Option<Nonce>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pkce_challenge: Option<pkce::Challenge>,
    pub auth_time: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedGrant {
    pub handle: GrantHandle,
    pub kind: GrantKind,
    pub client_id: ClientId,
    pub subject: String,
    pub data: GrantData,
    pub origin: Option<GrantHandle>,
    pub issued_at: i64,
    pub expires_at: i64,
    pub consumed: bool,
    pub revoked: bool,
}

impl PersistedGrant {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
