use crate::auth::pkce;
use crate::core::types::{AuthCode, ClientId, RedirectUri, Scope};
use crate::oidc::types::{Nonce, Prompt};

use super::error::ErrorResponse;
use super::{MaybeRedirect, WithState};

pub type AuthorizationErrorResponse = WithState<ErrorResponse<AuthorizationErrorKind>>;
pub type AuthorizationError =
    MaybeRedirect<AuthorizationErrorResponse, ErrorResponse<AuthorizationErrorKind>>;

/// Query (GET) or form (POST) parameters of an authorization request.
///
/// `response_type` stays a plain string so an unsupported value can still be
/// answered with a redirect once the client and redirect URI are known.
#[derive(Debug, Clone)]
#[derive(serde::Deserialize)]
pub struct AuthorizationRequest {
    pub response_type: String,
    pub client_id: ClientId,
    pub redirect_uri: RedirectUri,
    #[serde(default)]
    pub scope: Scope,
    pub state: Option<String>,
    pub nonce: Option<Nonce>,
    pub prompt: Option<Prompt>,
    #[serde(flatten)]
    pub pkce_challenge: Option<pkce::Challenge>,
}

impl AuthorizationRequest {
    pub fn is_code_request(&self) -> bool {
        self.response_type == "code"
    }
}

#[derive(Debug, Clone)]
#[derive(serde::Serialize)]
pub struct AuthorizationResponse {
    code: AuthCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl AuthorizationResponse {
    pub fn new(code: AuthCode, state: Option<String>) -> Self {
        Self { code, state }
    }

    pub fn code(&self) -> &AuthCode {
        &self.code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorKind {
    InvalidRequest,
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    InvalidScope,
    ConsentRequired,
    LoginRequired,
    ServerError,
    TemporarilyUnavailable,
}

impl From<AuthorizationErrorKind> for ErrorResponse<AuthorizationErrorKind> {
    fn from(kind: AuthorizationErrorKind) -> Self {
        ErrorResponse::new(kind)
    }
}
