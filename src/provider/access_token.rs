use crate::auth::{
    AccessTokenError, AccessTokenErrorKind, AccessTokenResponse, ClientCredentials, ErrorResponse,
    RefreshTokenRequest, TokenRequest,
};
use crate::core::models::{Client, GrantKind, PersistedGrant};
use crate::core::types::{unix_now, Expiry, GrantHandle, GrantType, RefreshToken, Scope};
use crate::provider::grant::GrantState;
use crate::provider::oidc::filter_claims;
use crate::provider::token::{IdTokenContext, SignedTokens, TokenService};
use crate::util::random::FromRandom;

use super::{Error, OAuth2Provider};

use tracing::{event, Level};

impl OAuth2Provider {
    #[tracing::instrument(skip_all, fields(client_id = %credentials.client_id))]
    pub async fn access_token_request(
        &self,
        credentials: ClientCredentials,
        req: TokenRequest,
    ) -> Result<AccessTokenResponse, AccessTokenError> {
        event!(Level::TRACE, "Handling access token request");
        let client = self.check_client_authentication(&credentials).await?;

        match req {
            TokenRequest::AuthorizationCode(req) => {
                event!(Level::TRACE, "Handling authorization_code grant");
                if !client.allows_grant(GrantType::AuthorizationCode) {
                    return Err(AccessTokenErrorKind::UnauthorizedClient.into());
                }

                let code = self.exchange_code(&client, &req).await?;
                let scope = code.data.scope.clone();
                let tokens = self.sign_tokens(&client, &code, &scope).await?;

                let refresh_token = if client.allows_grant(GrantType::RefreshToken) {
                    let expires_at = Expiry::from_now(self.settings.refresh_token_ttl).as_unix_secs();
                    let (token, handle) = self
                        .issue_refresh_token(&code, code.handle.clone(), expires_at)
                        .await?;
                    self.check_family_after_issue(&code.handle, &handle).await?.then(|| token)
                } else {
                    None
                };

                Ok(Self::response(tokens, refresh_token, scope))
            }
            TokenRequest::RefreshToken(req) => {
                event!(Level::TRACE, "Handling refresh_token grant");
                if !client.allows_grant(GrantType::RefreshToken) {
                    return Err(AccessTokenErrorKind::UnauthorizedClient.into());
                }

                self.refresh(&client, req).await
            }
        }
    }

    async fn refresh(
        &self,
        client: &Client,
        req: RefreshTokenRequest,
    ) -> Result<AccessTokenResponse, AccessTokenError> {
        let handle: GrantHandle = self.hasher.hash_without_salt(&req.refresh_token);
        let grant = self
            .grants
            .get(&handle)
            .await?
            .filter(|g| g.kind == GrantKind::RefreshToken)
            .ok_or(Error::GrantNotFound)?;

        if grant.client_id != client.id {
            event!(
                Level::WARN,
                original_client_id = %grant.client_id,
                refresh_client_id = %client.id,
                "client_ids do not match"
            );
            return Err(Error::GrantMismatch.into());
        }

        match grant.state(unix_now()) {
            GrantState::Exchanged => {
                self.reject_replay(&grant).await?;
                return Err(Error::GrantAlreadyConsumed.into());
            }
            GrantState::Rejected => return Err(Error::GrantRevoked.into()),
            GrantState::Expired => return Err(Error::GrantExpired.into()),
            GrantState::Requested | GrantState::CodeIssued => {}
        }

        let scope = match req.scope {
            Some(scope) if grant.data.scope.contains_all(&scope) => scope,
            Some(scope) => {
                event!(Level::DEBUG, scope = %scope, "Refresh asked for scope outside the grant");
                return Err(ErrorResponse::with_description(
                    AccessTokenErrorKind::InvalidScope,
                    format!("scope not granted: {}", scope.difference(&grant.data.scope)),
                ));
            }
            None => grant.data.scope.clone(),
        };

        let tokens = self.sign_tokens(client, &grant, &scope).await?;

        let refresh_token = if client.rotate_refresh_tokens {
            if !self.grants.atomic_consume(&handle).await? {
                self.reject_replay(&grant).await?;
                return Err(Error::GrantAlreadyConsumed.into());
            }

            let origin = grant.origin.clone().unwrap_or_else(|| grant.handle.clone());
            let (token, new_handle) = self
                .issue_refresh_token(&grant, origin, grant.expires_at)
                .await?;
            self.check_family_after_issue(&grant.handle, &new_handle)
                .await?
                .then(|| token)
        } else {
            Some(req.refresh_token)
        };

        Ok(Self::response(tokens, refresh_token, scope))
    }

    /// Signs the access token, plus an ID token when `openid` was granted.
    async fn sign_tokens(
        &self,
        client: &Client,
        grant: &PersistedGrant,
        scope: &Scope,
    ) -> Result<SignedTokens, Error> {
        let id_token = if scope.has_openid() {
            event!(Level::DEBUG, "Processing OpenID Connect extension data");
            let resources = self.config.get_scopes(scope).await?;
            let claims = self.identity.get_claims(&grant.subject).await?;
            Some(IdTokenContext {
                // The nonce belongs to the authentication; refreshed ID tokens omit it.
                nonce: if grant.kind == GrantKind::AuthorizationCode {
                    grant.data.nonce.as_ref()
                } else {
                    None
                },
                auth_time: grant.data.auth_time,
                claims: filter_claims(claims, &resources),
            })
        } else {
            None
        };

        self.token.issue(&client.id, &grant.subject, scope, id_token)
    }

    async fn issue_refresh_token(
        &self,
        parent: &PersistedGrant,
        origin: GrantHandle,
        expires_at: i64,
    ) -> Result<(RefreshToken, GrantHandle), Error> {
        let token = RefreshToken::from_random();
        let handle: GrantHandle = self.hasher.hash_without_salt(&token);

        let mut data = parent.data.clone();
        data.pkce_challenge = None;
        data.nonce = None;

        let grant = PersistedGrant {
            handle: handle.clone(),
            kind: GrantKind::RefreshToken,
            client_id: parent.client_id.clone(),
            subject: parent.subject.clone(),
            data,
            origin: Some(origin),
            issued_at: unix_now(),
            expires_at,
            consumed: false,
            revoked: false,
        };

        self.grants.put(&grant).await?;
        event!(Level::DEBUG, sub = %grant.subject, "Issued refresh token");
        Ok((token, handle))
    }

    /// A replay of `parent` may have revoked the family while the new refresh
    /// token was being written. Returns false, after revoking the new token,
    /// when that happened.
    async fn check_family_after_issue(
        &self,
        parent: &GrantHandle,
        issued: &GrantHandle,
    ) -> Result<bool, Error> {
        let revoked = self
            .grants
            .get(parent)
            .await?
            .map(|g| g.revoked)
            .unwrap_or(true);

        if revoked {
            event!(Level::WARN, "Grant family revoked during issuance, dropping refresh token");
            self.grants.revoke(issued).await?;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    fn response(
        tokens: SignedTokens,
        refresh_token: Option<RefreshToken>,
        scope: Scope,
    ) -> AccessTokenResponse {
        AccessTokenResponse {
            access_token: tokens.access_token,
            token_type: TokenService::token_type(),
            refresh_token,
            expires_in: Some(tokens.expires_in),
            scope,
            oidc: tokens
                .id_token
                .map(|id_token| crate::oidc::AccessTokenResponse { id_token }),
        }
    }
}
