use crate::core::types::RedirectUri;

use super::{ErrorResponse, TokenTypeHint};

#[derive(Debug, serde::Deserialize)]
pub struct RevocationRequest {
    pub token: String,
    pub token_type_hint: Option<TokenTypeHint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationErrorKind {
    InvalidClient,
    UnsupportedTokenType,
    TemporarilyUnavailable,
}

pub type RevocationError = ErrorResponse<RevocationErrorKind>;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EndSessionRequest {
    pub id_token_hint: String,
    pub post_logout_redirect_uri: Option<RedirectUri>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EndSessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
