use std::collections::HashMap;

use url::Url;
use warp::http::StatusCode;

use kagi::http::server::routes;

mod common;

use common::*;

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", base64::encode(format!("{}:{}", user, password)))
}

fn authorize_path(redirect_uri: &str) -> String {
    let query = serde_urlencoded::to_string(&[
        ("response_type", "code"),
        ("client_id", CLIENT_ID),
        ("redirect_uri", redirect_uri),
        ("scope", "openid profile"),
        ("state", "xyz"),
    ])
    .unwrap();
    format!("/authorize?{}", query)
}

fn location_params(location: &str) -> HashMap<String, String> {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn token_form(code: &str) -> String {
    serde_urlencoded::to_string(&[
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", REDIRECT_URI),
    ])
    .unwrap()
}

#[tokio::test]
async fn authorize_then_exchange_over_http() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("GET")
        .path(&authorize_path(REDIRECT_URI))
        .header("authorization", basic("alice", "wonderland"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let location = res.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://app/cb?"));
    let params = location_params(location);
    assert_eq!(params["state"], "xyz");
    let code = params["code"].clone();

    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(token_form(&code))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["cache-control"], "no-store");

    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["scope"], "openid profile");
    assert!(body["id_token"].is_string());
    assert!(body["refresh_token"].is_string());

    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(token_form(&code))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn client_credentials_may_come_in_the_form() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());
    let code = authorize(&fixture, "openid").await;

    let form = serde_urlencoded::to_string(&[
        ("grant_type", "authorization_code"),
        ("code", code.0.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
    ])
    .unwrap();

    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(form)
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unregistered_redirect_is_answered_directly() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("GET")
        .path(&authorize_path("https://app/cb/"))
        .header("authorization", basic("alice", "wonderland"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().get("location").is_none());

    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn missing_user_credentials_redirect_access_denied() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("GET")
        .path(&authorize_path(REDIRECT_URI))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let params = location_params(res.headers()["location"].to_str().unwrap());
    assert_eq!(params["error"], "access_denied");
    assert_eq!(params["state"], "xyz");
    assert!(!params.contains_key("code"));
}

#[tokio::test]
async fn unknown_grant_type_is_unsupported() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("grant_type=password&username=alice&password=wonderland")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn token_endpoint_requires_client_authentication() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(token_form("whatever"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authorize_without_client_id_is_invalid_request() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("GET")
        .path("/authorize?response_type=code&redirect_uri=https%3A%2F%2Fapp%2Fcb&scope=openid")
        .header("authorization", basic("alice", "wonderland"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().get("location").is_none());

    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn token_without_grant_type_is_invalid_request() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("code=whatever")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["error"], "invalid_request");

    // Missing client credentials are still answered as such.
    let res = warp::test::request()
        .method("POST")
        .path("/token")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("code=whatever")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoke_tolerates_unknown_hint() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("POST")
        .path("/revoke")
        .header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("token=never-issued&token_type_hint=id_token")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn revoke_endpoint_answers_ok() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("POST")
        .path("/revoke")
        .header("authorization", basic(CLIENT_ID, CLIENT_SECRET))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("token=never-issued")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = warp::test::request()
        .method("POST")
        .path("/revoke")
        .header("authorization", basic(CLIENT_ID, "wrong"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("token=never-issued")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn discovery_lists_endpoints() {
    let fixture = fixture().await;
    let api = routes(fixture.provider.clone(), ISSUER.to_string());

    let res = warp::test::request()
        .method("GET")
        .path("/.well-known/openid-configuration")
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["issuer"], ISSUER);
    assert_eq!(body["token_endpoint"], "https://id.example/token");
    assert_eq!(body["id_token_signing_alg_values_supported"][0], "ES256");
}
