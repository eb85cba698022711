use std::fmt;

use crate::auth::{
    AccessTokenError, AccessTokenErrorKind, AuthorizationErrorKind, ErrorResponse, MaybeRedirect,
    Redirect, WithState,
};
use crate::core::types::RedirectUri;

#[derive(Debug)]
pub enum Error {
    ConfigNotFound(String),
    InvalidRedirect,
    GrantNotFound,
    GrantMismatch,
    GrantExpired,
    GrantAlreadyConsumed,
    GrantRevoked,
    SignatureKeyUnavailable(String),
    StoreUnavailable(String),
    Unauthorized,
    BadRequest,
    Serde(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigNotFound(what) => write!(f, "unknown {}", what),
            Self::InvalidRedirect => write!(f, "redirect uri is not registered for client"),
            Self::GrantNotFound => write!(f, "grant not found"),
            Self::GrantMismatch => write!(f, "grant does not match request"),
            Self::GrantExpired => write!(f, "grant expired"),
            Self::GrantAlreadyConsumed => write!(f, "grant already consumed"),
            Self::GrantRevoked => write!(f, "grant revoked"),
            Self::SignatureKeyUnavailable(e) => write!(f, "signing key unavailable: {}", e),
            Self::StoreUnavailable(e) => write!(f, "store unavailable: {}", e),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::BadRequest => write!(f, "bad request"),
            Self::Serde(e) => write!(f, "serialization error: {}", e),
            Self::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<diesel_migrations::RunMigrationsError> for Error {
    fn from(e: diesel_migrations::RunMigrationsError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<Error> for AccessTokenError {
    fn from(e: Error) -> Self {
        use AccessTokenErrorKind::*;

        let kind = match &e {
            Error::ConfigNotFound(_) | Error::Unauthorized => InvalidClient,
            Error::GrantNotFound
            | Error::GrantMismatch
            | Error::GrantExpired
            | Error::GrantAlreadyConsumed
            | Error::GrantRevoked
            | Error::InvalidRedirect => InvalidGrant,
            Error::BadRequest => InvalidRequest,
            Error::StoreUnavailable(_) => TemporarilyUnavailable,
            Error::SignatureKeyUnavailable(_) | Error::Serde(_) | Error::Io(_) => ServerError,
        };

        match kind {
            ServerError | TemporarilyUnavailable => ErrorResponse::new(kind),
            _ => ErrorResponse::with_description(kind, e.to_string()),
        }
    }
}

impl From<&Error> for AuthorizationErrorKind {
    fn from(e: &Error) -> Self {
        match e {
            Error::StoreUnavailable(_) => AuthorizationErrorKind::TemporarilyUnavailable,
            Error::ConfigNotFound(_) => AuthorizationErrorKind::InvalidScope,
            Error::Unauthorized => AuthorizationErrorKind::AccessDenied,
            _ => AuthorizationErrorKind::ServerError,
        }
    }
}

pub trait ResultExt<T, E> {
    fn without_redirect<R>(self) -> Result<T, MaybeRedirect<R, E>>;
    fn add_redirect_context<D>(self, uri: RedirectUri) -> Result<T, MaybeRedirect<E, D>>;
    fn add_state_context(self, state: &Option<String>) -> Result<T, WithState<E>>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn without_redirect<R>(self) -> Result<T, MaybeRedirect<R, E>> {
        self.map_err(MaybeRedirect::Direct)
    }

    fn add_redirect_context<D>(self, uri: RedirectUri) -> Result<T, MaybeRedirect<E, D>> {
        self.map_err(|e| MaybeRedirect::Redirected(Redirect::new(uri, e)))
    }

    fn add_state_context(self, state: &Option<String>) -> Result<T, WithState<E>> {
        self.map_err(|e| WithState {
            state: state.clone(),
            inner: e,
        })
    }
}
