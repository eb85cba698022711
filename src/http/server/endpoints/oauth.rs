use std::convert::TryFrom;
use std::sync::Arc;

use warp::Filter;

use crate::auth::{
    revocation::{EndSessionRequest, RevocationRequest},
    AuthorizationRequest, TokenRequest, TokenRequestForm,
};
use crate::http::encoding::{self, reply};
use crate::provider::OAuth2Provider;

pub fn oauth_endpoint(
    provider: Arc<OAuth2Provider>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_provider = warp::any().map(move || provider.clone());

    let authorize_params = warp::get()
        .and(warp::query::<AuthorizationRequest>())
        .or(warp::post().and(warp::body::form::<AuthorizationRequest>()))
        .unify();

    // Either a redirect to the client or a direct error
    let authorize = warp::path("authorize")
        .and(warp::path::end())
        .and(with_provider.clone())
        .and(authorize_params)
        .and(encoding::optional_user_credentials())
        .and_then(|provider: Arc<OAuth2Provider>, req, user| async move {
            let result = provider.authorization_request(req, user).await;
            reply::reply(result)
        });

    // Either a direct success or a direct error
    let token = warp::path("token")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_provider.clone())
        .and(encoding::body_with_credentials::<TokenRequestForm>())
        .and_then(
            |provider: Arc<OAuth2Provider>, (credentials, form)| async move {
                let req = reply::accept(TokenRequest::try_from(form))?;
                let result = provider.access_token_request(credentials, req).await;
                reply::no_store(result)
            },
        );

    let revoke = warp::path("revoke")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_provider.clone())
        .and(encoding::body_with_credentials::<RevocationRequest>())
        .and_then(
            |provider: Arc<OAuth2Provider>, (credentials, req)| async move {
                let result = provider.revocation_request(credentials, req).await;
                reply::reply(result.map(|_| warp::reply()))
            },
        );

    let end_session = warp::path("endsession")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_provider)
        .and(warp::query::<EndSessionRequest>())
        .and_then(|provider: Arc<OAuth2Provider>, req| async move {
            let redirect = reply::accept(provider.end_session_request(req).await)?;
            Ok::<_, warp::Rejection>(match redirect {
                Some(redirect) => warp::reply::Reply::into_response(redirect),
                None => warp::reply::Reply::into_response(warp::reply()),
            })
        });

    authorize.or(token).or(revoke).or(end_session)
}
