use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use crate::provider::OAuth2Provider;

mod endpoints;

use endpoints::{discovery::discovery_endpoint, oauth::oauth_endpoint};

use super::encoding::error::handle_reject;

/// Every route the provider serves, with rejections rendered as protocol
/// errors.
pub fn routes(
    provider: Arc<OAuth2Provider>,
    public_url: String,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let oauth = oauth_endpoint(provider.clone());
    let discovery = discovery_endpoint(provider, public_url);

    oauth
        .or(discovery)
        .recover(handle_reject)
        .with(warp::log("http-api"))
}

#[derive(Debug)]
pub struct Server {
    provider: Arc<OAuth2Provider>,
    public_url: String,
}

impl Server {
    pub fn new(provider: Arc<OAuth2Provider>, public_url: String) -> Self {
        Self {
            provider: Arc::clone(&provider),
            public_url,
        }
    }

    pub async fn serve(self, addr: SocketAddr) {
        let routes = routes(self.provider, self.public_url);
        warp::serve(routes).run(addr).await;
    }
}
