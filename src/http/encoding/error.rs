use crate::auth::{
    revocation::{RevocationError, RevocationErrorKind},
    AccessTokenError, AccessTokenErrorKind, AuthorizationError, AuthorizationErrorKind,
    AuthorizationErrorResponse, ErrorResponse, MaybeRedirect, Redirect,
};
use crate::provider::Error;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

#[derive(Debug)]
pub enum AuthRejection {
    Authorization(Redirect<AuthorizationErrorResponse>),
    BadAuthorization(ErrorResponse<AuthorizationErrorKind>),
    AccessToken(AccessTokenError),
    Revocation(RevocationError),
    Provider(Error),
    Unauthorized,
}

impl warp::reject::Reject for AuthRejection {}

impl From<AuthorizationError> for AuthRejection {
    fn from(error: AuthorizationError) -> Self {
        match error {
            MaybeRedirect::Redirected(r) => Self::Authorization(r),
            MaybeRedirect::Direct(d) => Self::BadAuthorization(d),
        }
    }
}

impl From<AccessTokenError> for AuthRejection {
    fn from(error: AccessTokenError) -> Self {
        Self::AccessToken(error)
    }
}

impl From<RevocationError> for AuthRejection {
    fn from(error: RevocationError) -> Self {
        Self::Revocation(error)
    }
}

impl From<Error> for AuthRejection {
    fn from(error: Error) -> Self {
        Self::Provider(error)
    }
}

fn access_token_status(kind: AccessTokenErrorKind) -> StatusCode {
    match kind {
        AccessTokenErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        AccessTokenErrorKind::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn revocation_status(kind: RevocationErrorKind) -> StatusCode {
    match kind {
        RevocationErrorKind::InvalidClient => StatusCode::UNAUTHORIZED,
        RevocationErrorKind::UnsupportedTokenType => StatusCode::BAD_REQUEST,
        RevocationErrorKind::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn provider_error(error: &Error) -> (StatusCode, ErrorResponse<&'static str>) {
    match error {
        Error::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new("temporarily_unavailable"),
        ),
        Error::SignatureKeyUnavailable(_) | Error::Serde(_) | Error::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("server_error"),
        ),
        Error::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new("invalid_client"),
        ),
        other => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::with_description("invalid_request", other.to_string()),
        ),
    }
}

fn json_error(status: StatusCode, body: &impl serde::Serialize) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

/// Query strings, form bodies or headers warp could not decode.
fn is_malformed(err: &Rejection) -> bool {
    err.find::<warp::reject::InvalidQuery>().is_some()
        || err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
}

pub async fn handle_reject(err: Rejection) -> Result<impl Reply, Rejection> {
    let rejection = match err.find::<AuthRejection>() {
        Some(rejection) => rejection,
        None if is_malformed(&err) => {
            return Ok(json_error(
                StatusCode::BAD_REQUEST,
                &ErrorResponse::with_description("invalid_request", "malformed request"),
            ))
        }
        None => return Err(err),
    };

    let response = match rejection {
        AuthRejection::Authorization(redirect) => redirect.clone().into_response(),
        AuthRejection::BadAuthorization(e) => json_error(StatusCode::BAD_REQUEST, e),
        AuthRejection::AccessToken(e) => json_error(access_token_status(e.kind), e),
        AuthRejection::Revocation(e) => json_error(revocation_status(e.kind), e),
        AuthRejection::Provider(e) => {
            let (status, body) = provider_error(e);
            json_error(status, &body)
        }
        AuthRejection::Unauthorized => json_error(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse::with_description(
                AccessTokenErrorKind::InvalidClient,
                "client authentication required",
            ),
        ),
    };

    Ok(response)
}
