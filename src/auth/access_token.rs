use std::convert::TryFrom;

use crate::auth::pkce;
use crate::core::types::{AuthCode, RedirectUri, RefreshToken, Scope};
use crate::oidc;

use super::error::ErrorResponse;

pub type AccessTokenError = ErrorResponse<AccessTokenErrorKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TokenType {
    Bearer,
}

/// Hints outside RFC 7009 are accepted and ignored, as the RFC requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
    #[serde(other)]
    Unknown,
}

/// Token endpoint form as it arrives. Converted into [`TokenRequest`] so an
/// unknown `grant_type` gets a proper `unsupported_grant_type` answer.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TokenRequestForm {
    pub grant_type: Option<String>,
    pub code: Option<AuthCode>,
    pub redirect_uri: Option<RedirectUri>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<RefreshToken>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone)]
pub enum TokenRequest {
    AuthorizationCode(AuthorizationCodeTokenRequest),
    RefreshToken(RefreshTokenRequest),
}

#[derive(Debug, Clone)]
pub struct AuthorizationCodeTokenRequest {
    pub redirect_uri: RedirectUri,
    pub code: AuthCode,
    pub pkce_verifier: Option<pkce::Verifier>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRequest {
    pub refresh_token: RefreshToken,
    pub scope: Option<Scope>,
}

fn missing(parameter: &str) -> AccessTokenError {
    ErrorResponse::with_description(
        AccessTokenErrorKind::InvalidRequest,
        format!("missing parameter {}", parameter),
    )
}

impl TryFrom<TokenRequestForm> for TokenRequest {
    type Error = AccessTokenError;

    fn try_from(form: TokenRequestForm) -> Result<Self, Self::Error> {
        match form.grant_type.as_deref() {
            Some("authorization_code") => Ok(Self::AuthorizationCode(AuthorizationCodeTokenRequest {
                code: form.code.ok_or_else(|| missing("code"))?,
                redirect_uri: form.redirect_uri.ok_or_else(|| missing("redirect_uri"))?,
                pkce_verifier: form.code_verifier.map(|value| pkce::Verifier { value }),
            })),
            Some("refresh_token") => Ok(Self::RefreshToken(RefreshTokenRequest {
                refresh_token: form.refresh_token.ok_or_else(|| missing("refresh_token"))?,
                scope: form.scope.filter(|s| !s.is_empty()),
            })),
            Some(_) => Err(AccessTokenErrorKind::UnsupportedGrantType.into()),
            None => Err(missing("grant_type")),
        }
    }
}

#[derive(serde::Serialize, Debug, Clone)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub scope: Scope,
    #[serde(flatten)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc: Option<oidc::AccessTokenResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTokenErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
    ServerError,
    TemporarilyUnavailable,
}

impl From<AccessTokenErrorKind> for AccessTokenError {
    fn from(kind: AccessTokenErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn form(grant_type: &str) -> TokenRequestForm {
        TokenRequestForm {
            grant_type: Some(grant_type.to_string()),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            refresh_token: None,
            scope: None,
        }
    }

    #[test]
    fn unknown_grant_type_is_unsupported() {
        let err = TokenRequest::try_from(form("password")).unwrap_err();
        assert_eq!(err.kind, AccessTokenErrorKind::UnsupportedGrantType);
    }

    #[test]
    fn missing_grant_type_is_invalid_request() {
        let form: TokenRequestForm = serde_urlencoded::from_str("code=K").unwrap();
        let err = TokenRequest::try_from(form).unwrap_err();
        assert_eq!(err.kind, AccessTokenErrorKind::InvalidRequest);
        assert_eq!(err.description.as_deref(), Some("missing parameter grant_type"));
    }

    #[test]
    fn unknown_token_type_hint_is_tolerated() {
        let req: crate::auth::revocation::RevocationRequest =
            serde_urlencoded::from_str("token=abc&token_type_hint=id_token").unwrap();
        assert_eq!(req.token_type_hint, Some(TokenTypeHint::Unknown));
    }

    #[test]
    fn code_grant_requires_redirect_uri() {
        let mut form = form("authorization_code");
        form.code = Some(AuthCode("abc".to_string()));
        let err = TokenRequest::try_from(form).unwrap_err();
        assert_eq!(err.kind, AccessTokenErrorKind::InvalidRequest);
        assert_eq!(err.description.as_deref(), Some("missing parameter redirect_uri"));
    }

    #[test]
    fn parses_form_body() {
        let body = "grant_type=authorization_code&code=K&redirect_uri=https%3A%2F%2Fapp%2Fcb&code_verifier=v";
        let form: TokenRequestForm = serde_urlencoded::from_str(body).unwrap();
        match TokenRequest::try_from(form).unwrap() {
            TokenRequest::AuthorizationCode(req) => {
                assert_eq!(req.code.0, "K");
                assert_eq!(req.redirect_uri.0, "https://app/cb");
                assert_eq!(req.pkce_verifier.unwrap().value, "v");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }
}
