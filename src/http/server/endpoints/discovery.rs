use std::sync::Arc;

use warp::Filter;

use crate::http::encoding::reply;
use crate::provider::OAuth2Provider;

pub fn discovery_endpoint(
    provider: Arc<OAuth2Provider>,
    public_url: String,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let public_url = Arc::new(public_url);

    warp::path!(".well-known" / "openid-configuration")
        .and(warp::get())
        .and_then(move || {
            let provider = Arc::clone(&provider);
            let public_url = Arc::clone(&public_url);
            async move { reply::json_encode(provider.discovery_document(&public_url).await) }
        })
}
