use crate::auth::{
    revocation::{
        EndSessionRequest, EndSessionResponse, RevocationError, RevocationErrorKind,
        RevocationRequest,
    },
    ClientCredentials, ErrorResponse, Redirect, TokenTypeHint,
};
use crate::core::models::GrantKind;
use crate::core::types::{ClientId, GrantHandle, RefreshToken};

use super::{error::Error, OAuth2Provider};

use tracing::{event, Level};

impl OAuth2Provider {
    /// Revokes a refresh token owned by the calling client. Unknown tokens
    /// and tokens of other clients are ignored without telling the caller.
    #[tracing::instrument(
        skip(self, credentials, request),
        fields(client_id = %credentials.client_id)
    )]
    pub async fn revocation_request(
        &self,
        credentials: ClientCredentials,
        request: RevocationRequest,
    ) -> Result<(), RevocationError> {
        self.check_client_authentication(&credentials)
            .await
            .map_err(|_| ErrorResponse::new(RevocationErrorKind::InvalidClient))?;

        if let Some(TokenTypeHint::AccessToken) = request.token_type_hint {
            event!(Level::DEBUG, "Access tokens are self-contained and cannot be revoked");
            return Err(ErrorResponse::new(RevocationErrorKind::UnsupportedTokenType));
        }

        let handle: GrantHandle = self
            .hasher
            .hash_without_salt(&RefreshToken(request.token));
        let grant = self
            .grants
            .get(&handle)
            .await
            .map_err(|e| {
                event!(Level::ERROR, error = %e, "Grant lookup failed");
                ErrorResponse::new(RevocationErrorKind::TemporarilyUnavailable)
            })?;

        match grant {
            Some(grant) if grant.kind == GrantKind::RefreshToken => {
                if grant.client_id != credentials.client_id {
                    event!(
                        Level::WARN,
                        original_client_id = %grant.client_id,
                        revoke_client_id = %credentials.client_id,
                        "client_ids do not match"
                    );
                    return Ok(());
                }

                event!(Level::DEBUG, "Revoking refresh token");
                self.grants.revoke(&handle).await.map_err(|e| {
                    event!(Level::ERROR, error = %e, "Failed to revoke refresh token");
                    ErrorResponse::new(RevocationErrorKind::TemporarilyUnavailable)
                })?;
            }
            _ => event!(Level::DEBUG, "Revocation of unknown token ignored"),
        }

        Ok(())
    }

    /// Ends the subject's session with the client named by the ID token
    /// hint: every grant the subject holds for that client is revoked. The
    /// redirect is only given back when the client registered it.
    #[tracing::instrument(skip_all)]
    pub async fn end_session_request(
        &self,
        request: EndSessionRequest,
    ) -> Result<Option<Redirect<EndSessionResponse>>, Error> {
        let claims = self
            .token
            .validate_id_token_hint(&request.id_token_hint)
            .map_err(|_| Error::BadRequest)?;
        let client_id = ClientId(claims.aud);
        let client = self.config.get_client(&client_id).await?;

        let redirect = match request.post_logout_redirect_uri {
            Some(uri) if client.has_post_logout_redirect_uri(&uri) => Some(Redirect::new(
                uri,
                EndSessionResponse {
                    state: request.state,
                },
            )),
            Some(uri) => {
                event!(
                    Level::WARN,
                    client_id = %client.id,
                    redirect_uri = ?uri,
                    "Post logout redirect uri is not registered"
                );
                return Err(Error::InvalidRedirect);
            }
            None => None,
        };

        let revoked = self
            .grants
            .revoke_all_for_subject(&claims.sub, &client.id)
            .await?;
        event!(Level::INFO, client_id = %client.id, revoked, "Ended session");

        Ok(redirect)
    }
}
