pub mod error;
pub mod reply;

use crate::auth::{ClientCredentials, UserCredentials};
use crate::core::types::{ClientId, ClientSecret};
use http_basic_auth::Credential as BasicCredentials;
use warp::{Filter, Rejection};

use self::error::AuthRejection;

/// A form body that may also carry `client_id`/`client_secret`.
#[derive(serde::Deserialize)]
pub struct WithCredentials<T> {
    client_id: Option<ClientId>,
    client_secret: Option<ClientSecret>,
    #[serde(flatten)]
    body: T,
}

impl<T> WithCredentials<T> {
    /// HTTP Basic wins over form fields. Missing or malformed credentials
    /// are a client authentication failure, never a decoding one.
    fn split(
        self,
        authorization: Option<String>,
    ) -> Result<(ClientCredentials, T), AuthRejection> {
        let credentials = match (authorization, self.client_id, self.client_secret) {
            (Some(header), _, _) => {
                let basic = header
                    .parse::<BasicCredentials>()
                    .map_err(|_| AuthRejection::Unauthorized)?;
                ClientCredentials {
                    client_id: ClientId(basic.user_id),
                    client_secret: ClientSecret(basic.password),
                }
            }
            (None, Some(client_id), Some(client_secret)) => ClientCredentials {
                client_id,
                client_secret,
            },
            _ => return Err(AuthRejection::Unauthorized),
        };

        Ok((credentials, self.body))
    }
}

/// Form body plus client credentials, taken from HTTP Basic or from the
/// `client_id`/`client_secret` form fields.
pub fn body_with_credentials<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = ((ClientCredentials, T),), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::body::form::<WithCredentials<T>>())
        .and_then(|authorization, form: WithCredentials<T>| async move {
            form.split(authorization).map_err(warp::reject::custom)
        })
}

/// End-user credentials presented with HTTP Basic on the authorize request.
pub fn optional_user_credentials(
) -> impl Filter<Extract = (Option<UserCredentials>,), Error = Rejection> + Clone {
    warp::header::optional::<BasicCredentials>("authorization").map(
        |credentials: Option<BasicCredentials>| {
            credentials.map(|c| UserCredentials {
                username: c.user_id,
                password: c.password,
            })
        },
    )
}
