use crate::auth::Redirect;
use crate::core::types::RedirectUri;
use tracing::{event, Level};
use url::Url;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

fn append_params(r: &RedirectUri, p: impl serde::Serialize) -> Result<Url, String> {
    let mut url = Url::parse(&r.0).map_err(|e| e.to_string())?;
    let new_qs = serde_urlencoded::to_string(p).map_err(|e| e.to_string())?;
    let pairs = form_urlencoded::parse(new_qs.as_bytes());
    url.query_pairs_mut().extend_pairs(pairs);
    Ok(url)
}

impl<T: serde::Serialize + Send> Reply for Redirect<T> {
    fn into_response(self) -> Response {
        let url = match append_params(&self.uri, self.params) {
            Ok(url) => url,
            Err(e) => {
                event!(Level::ERROR, uri = ?self.uri, error = %e, "Failed to build redirect");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let location = url.to_string();
        warp::http::Response::builder()
            .header("location", location.as_str())
            .status(StatusCode::FOUND)
            .body(warp::hyper::Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(serde::Serialize)]
    struct Params {
        code: &'static str,
        state: Option<&'static str>,
    }

    #[test]
    fn keeps_existing_query_and_appends_params() {
        let redirect = Redirect::new(
            RedirectUri("https://app/cb?tenant=a".to_string()),
            Params {
                code: "K",
                state: Some("x y"),
            },
        );

        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()["location"],
            "https://app/cb?tenant=a&code=K&state=x+y"
        );
    }
}
