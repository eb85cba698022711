//! Authorization-code grant state machine.
//!
//! A grant is never stored with an explicit state. Its state is derived from
//! the persisted record at read time, so expiry needs no timer and the only
//! transition that must be atomic is consumption, which the store owns.

use tracing::{event, Level};

use crate::auth::{
    pkce, AuthorizationCodeTokenRequest, AuthorizationError, AuthorizationErrorKind,
    AuthorizationRequest, ErrorResponse, MaybeRedirect, Redirect,
};
use crate::core::models::{Client, GrantData, GrantKind, PersistedGrant};
use crate::core::types::{unix_now, AuthCode, Expiry, GrantHandle, GrantType};
use crate::util::random::FromRandom;

use super::{error::Error, OAuth2Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantState {
    /// Authorize request under validation; never persisted.
    Requested,
    /// Issued and usable. For refresh tokens this is the active state.
    CodeIssued,
    Exchanged,
    Expired,
    Rejected,
}

impl PersistedGrant {
    /// Consumption wins over revocation so a replayed code keeps being
    /// reported as a replay after its family was revoked.
    pub fn state(&self, now: i64) -> GrantState {
        if self.consumed {
            GrantState::Exchanged
        } else if self.revoked {
            GrantState::Rejected
        } else if self.is_expired(now) {
            GrantState::Expired
        } else {
            GrantState::CodeIssued
        }
    }
}

fn redirect_error(
    req: &AuthorizationRequest,
    kind: AuthorizationErrorKind,
    description: impl Into<String>,
) -> AuthorizationError {
    let response = ErrorResponse::with_description(kind, description);
    MaybeRedirect::Redirected(Redirect::new(
        req.redirect_uri.clone(),
        (response, req.state.clone()).into(),
    ))
}

impl OAuth2Provider {
    /// Checks an authorize request in order. Until the client and its
    /// redirect URI are known, failures are answered directly; afterwards
    /// they are redirected back to the client.
    pub(crate) async fn validate_authorization_request(
        &self,
        req: &AuthorizationRequest,
    ) -> Result<Client, AuthorizationError> {
        event!(Level::TRACE, state = ?GrantState::Requested, "Validating authorization request");

        let client = match self.config.get_client(&req.client_id).await {
            Ok(client) => client,
            Err(Error::ConfigNotFound(_)) => {
                event!(Level::WARN, client_id = %req.client_id, "Unknown client");
                return Err(MaybeRedirect::Direct(ErrorResponse::with_description(
                    AuthorizationErrorKind::InvalidRequest,
                    "unknown client",
                )));
            }
            Err(e) => {
                event!(Level::ERROR, error = %e, "Client lookup failed");
                return Err(MaybeRedirect::Direct(ErrorResponse::new((&e).into())));
            }
        };

        if !client.has_redirect_uri(&req.redirect_uri) {
            event!(
                Level::WARN,
                client_id = %client.id,
                redirect_uri = ?req.redirect_uri,
                "Redirect uri does not match any registered uri"
            );
            return Err(MaybeRedirect::Direct(ErrorResponse::with_description(
                AuthorizationErrorKind::InvalidRequest,
                "redirect_uri is not registered for this client",
            )));
        }

        if !req.is_code_request() {
            return Err(redirect_error(
                req,
                AuthorizationErrorKind::UnsupportedResponseType,
                format!("unsupported response_type {}", req.response_type),
            ));
        }

        if !client.allows_grant(GrantType::AuthorizationCode) {
            return Err(redirect_error(
                req,
                AuthorizationErrorKind::UnauthorizedClient,
                "client may not use the authorization_code grant",
            ));
        }

        if req.scope.is_empty() {
            return Err(redirect_error(
                req,
                AuthorizationErrorKind::InvalidScope,
                "scope is required",
            ));
        }

        let not_allowed = req.scope.difference(&client.allowed_scopes);
        if !not_allowed.is_empty() {
            return Err(redirect_error(
                req,
                AuthorizationErrorKind::InvalidScope,
                format!("scope not allowed: {}", not_allowed),
            ));
        }

        match self.config.get_scopes(&req.scope).await {
            Ok(_) => {}
            Err(e @ Error::ConfigNotFound(_)) => {
                return Err(redirect_error(
                    req,
                    AuthorizationErrorKind::InvalidScope,
                    e.to_string(),
                ))
            }
            Err(e) => {
                let response = ErrorResponse::new((&e).into());
                return Err(MaybeRedirect::Redirected(Redirect::new(
                    req.redirect_uri.clone(),
                    (response, req.state.clone()).into(),
                )));
            }
        }

        if client.require_pkce && req.pkce_challenge.is_none() {
            return Err(redirect_error(
                req,
                AuthorizationErrorKind::InvalidRequest,
                "code_challenge is required",
            ));
        }

        Ok(client)
    }

    /// Persists the digest of a fresh code and hands the raw code back.
    pub(crate) async fn issue_code(
        &self,
        client: &Client,
        subject: String,
        req: &AuthorizationRequest,
    ) -> Result<AuthCode, Error> {
        let code = AuthCode::from_random();
        let now = unix_now();

        let grant = PersistedGrant {
            handle: self.hasher.hash_without_salt(&code),
            kind: GrantKind::AuthorizationCode,
            client_id: client.id.clone(),
            subject,
            data: GrantData {
                scope: req.scope.clone(),
                redirect_uri: Some(req.redirect_uri.clone()),
                nonce: req.nonce.clone(),
                pkce_challenge: req.pkce_challenge.clone(),
                auth_time: now,
            },
            origin: None,
            issued_at: now,
            expires_at: Expiry::from_now(self.settings.code_ttl).as_unix_secs(),
            consumed: false,
            revoked: false,
        };

        self.grants.put(&grant).await?;
        event!(
            Level::DEBUG,
            client_id = %client.id,
            state = ?GrantState::CodeIssued,
            "Issued authorization code"
        );
        Ok(code)
    }

    /// Moves a code to `Exchanged`. Exactly one caller per code gets the
    /// grant back; every other one triggers the replay cascade.
    pub(crate) async fn exchange_code(
        &self,
        client: &Client,
        req: &AuthorizationCodeTokenRequest,
    ) -> Result<PersistedGrant, Error> {
        let handle: GrantHandle = self.hasher.hash_without_salt(&req.code);
        let grant = self
            .grants
            .get(&handle)
            .await?
            .filter(|g| g.kind == GrantKind::AuthorizationCode)
            .ok_or(Error::GrantNotFound)?;

        match grant.state(unix_now()) {
            GrantState::Exchanged => {
                self.reject_replay(&grant).await?;
                return Err(Error::GrantAlreadyConsumed);
            }
            GrantState::Rejected => return Err(Error::GrantRevoked),
            GrantState::Expired => return Err(Error::GrantExpired),
            GrantState::Requested | GrantState::CodeIssued => {}
        }

        if grant.client_id != client.id
            || grant.data.redirect_uri.as_ref() != Some(&req.redirect_uri)
        {
            event!(
                Level::WARN,
                original_client_id = %grant.client_id,
                client_id = %client.id,
                "Code presented with mismatching client or redirect uri"
            );
            return Err(Error::GrantMismatch);
        }

        if let Some(challenge) = &grant.data.pkce_challenge {
            event!(Level::DEBUG, "Verifying PKCE challenge");
            if !pkce::verify(challenge, req.pkce_verifier.as_ref()) {
                return Err(Error::GrantMismatch);
            }
        }

        if !self.grants.atomic_consume(&handle).await? {
            self.reject_replay(&grant).await?;
            return Err(Error::GrantAlreadyConsumed);
        }

        event!(Level::DEBUG, client_id = %client.id, state = ?GrantState::Exchanged, "Exchanged authorization code");
        Ok(grant)
    }

    /// Revokes a replayed grant and everything issued under the same code.
    /// The grant itself is revoked first so a concurrent winner re-checking
    /// it after issuing can see the replay.
    pub(crate) async fn reject_replay(&self, grant: &PersistedGrant) -> Result<(), Error> {
        let origin = grant.origin.as_ref().unwrap_or(&grant.handle);
        event!(
            Level::WARN,
            client_id = %grant.client_id,
            kind = grant.kind.as_str(),
            "Grant replayed, revoking its family"
        );

        self.grants.revoke(&grant.handle).await?;
        self.grants.revoke(origin).await?;
        let revoked = self.grants.revoke_family(origin).await?;
        event!(Level::INFO, revoked, "Revoked grant family");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::types::{ClientId, GrantHandle, Scope};

    fn grant(expires_at: i64) -> PersistedGrant {
        PersistedGrant {
            handle: GrantHandle("h".to_string()),
            kind: GrantKind::AuthorizationCode,
            client_id: ClientId("c1".to_string()),
            subject: "alice".to_string(),
            data: GrantData {
                scope: Scope::from_delimited_parts("openid"),
                redirect_uri: None,
                nonce: None,
                pkce_challenge: None,
                auth_time: 0,
            },
            origin: None,
            issued_at: 0,
            expires_at,
            consumed: false,
            revoked: false,
        }
    }

    #[test]
    fn fresh_grant_is_issued() {
        assert_eq!(grant(100).state(50), GrantState::CodeIssued);
    }

    #[test]
    fn expiry_is_inclusive() {
        assert_eq!(grant(100).state(100), GrantState::Expired);
        assert_eq!(grant(100).state(99), GrantState::CodeIssued);
    }

    #[test]
    fn consumed_wins_over_revoked_and_expired() {
        let mut g = grant(100);
        g.consumed = true;
        g.revoked = true;
        assert_eq!(g.state(500), GrantState::Exchanged);
    }

    #[test]
    fn revoked_wins_over_expired() {
        let mut g = grant(100);
        g.revoked = true;
        assert_eq!(g.state(500), GrantState::Rejected);
    }
}
