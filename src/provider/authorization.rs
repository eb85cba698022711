use crate::{
    auth::{
        AuthorizationError, AuthorizationErrorKind, AuthorizationRequest, AuthorizationResponse,
        ErrorResponse, Redirect, UserCredentials,
    },
    oidc::types::Prompt,
    provider::error::ResultExt,
};

use tracing::{event, Level};

use super::OAuth2Provider;

impl OAuth2Provider {
    /// Validates an authorize request, authenticates the end user and
    /// answers with a redirect carrying a fresh code.
    #[tracing::instrument(skip_all, fields(client_id = %req.client_id))]
    pub async fn authorization_request(
        &self,
        req: AuthorizationRequest,
        user: Option<UserCredentials>,
    ) -> Result<Redirect<AuthorizationResponse>, AuthorizationError> {
        let client = self.validate_authorization_request(&req).await?;
        let uri = req.redirect_uri.clone();
        let state = req.state.clone();

        let user = match user {
            Some(user) => user,
            None => {
                let kind = match req.prompt {
                    Some(Prompt::None) => AuthorizationErrorKind::LoginRequired,
                    _ => AuthorizationErrorKind::AccessDenied,
                };
                event!(Level::DEBUG, "No end-user credentials on authorization request");
                return Err(ErrorResponse::new(kind))
                    .add_state_context(&state)
                    .add_redirect_context(uri);
            }
        };

        let subject = self
            .identity
            .authenticate(&user)
            .await
            .map_err(|e| ErrorResponse::new(AuthorizationErrorKind::from(&e)))
            .add_state_context(&state)
            .add_redirect_context(uri.clone())?;

        if client.require_consent {
            event!(Level::DEBUG, client_id = %client.id, "Client requires consent");
            return Err(ErrorResponse::new(AuthorizationErrorKind::ConsentRequired))
                .add_state_context(&state)
                .add_redirect_context(uri);
        }

        let code = self
            .issue_code(&client, subject, &req)
            .await
            .map_err(|e| {
                event!(Level::ERROR, error = %e, "Failed to persist authorization code");
                ErrorResponse::new(AuthorizationErrorKind::from(&e))
            })
            .add_state_context(&state)
            .add_redirect_context(uri.clone())?;

        Ok(Redirect::new(uri, AuthorizationResponse::new(code, state)))
    }
}
