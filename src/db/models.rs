use super::schema::*;

#[derive(Debug, Clone, PartialEq)]
#[derive(Queryable, Insertable)]
#[table_name = "clients"]
pub struct Client {
    pub client_id: String,
    pub secret_hash: String,
    pub name: String,
    pub require_consent: bool,
    pub require_pkce: bool,
    pub rotate_refresh_tokens: bool,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "uris"]
pub struct Uri {
    pub client_id: String,
    pub uri: String,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "post_logout_uris"]
pub struct PostLogoutUri {
    pub client_id: String,
    pub uri: String,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "client_scopes"]
pub struct ClientScope {
    pub client_id: String,
    pub scope: String,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "client_grant_types"]
pub struct ClientGrantType {
    pub client_id: String,
    pub grant_type: String,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Queryable, Insertable)]
#[table_name = "identity_resources"]
pub struct IdentityResource {
    pub name: String,
    pub display_name: Option<String>,
    pub claims: String,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Queryable, Insertable)]
#[table_name = "api_scopes"]
pub struct ApiScope {
    pub name: String,
    pub display_name: Option<String>,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "persisted_grants"]
pub struct PersistedGrant {
    pub handle: String,
    pub kind: String,
    pub client_id: String,
    pub subject: String,
    pub data: String,
    pub origin: Option<String>,
    pub issued_at: i64,
    pub expires_at: i64,
    pub consumed: bool,
    pub revoked: bool,
}
