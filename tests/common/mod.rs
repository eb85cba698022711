#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde_json::{Map, Value};

use kagi::auth::{
    pkce, AccessTokenError, AccessTokenResponse, AuthorizationCodeTokenRequest,
    AuthorizationRequest, ClientCredentials, ConfigStore, TokenRequest, UserCredentials,
};
use kagi::core::models::{ApiScope, Client, IdentityResource};
use kagi::core::types::{
    AuthCode, ClientId, ClientSecret, GrantType, RedirectUri, Scope,
};
use kagi::db::MemoryStore;
use kagi::provider::{
    identity::{StaticIdentityProvider, StaticUser},
    keys::{KeyProvider, PemKeyProvider},
    token::TokenService,
    Error, OAuth2Provider, ProviderSettings,
};
use kagi::util::hash::HashingService;

pub const CLIENT_ID: &str = "c1";
pub const CLIENT_SECRET: &str = "secret";
pub const REDIRECT_URI: &str = "https://app/cb";
pub const POST_LOGOUT_URI: &str = "https://app/signed-out";
pub const ISSUER: &str = "https://id.example";

pub struct Fixture {
    pub provider: Arc<OAuth2Provider>,
    pub store: Arc<MemoryStore>,
}

pub struct Options {
    pub settings: ProviderSettings,
    pub keys: Arc<dyn KeyProvider>,
    pub client: Client,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::default(),
            keys: Arc::new(pem_keys()),
            client: client(&hasher()),
        }
    }
}

/// Key provider whose key custody is down.
pub struct UnavailableKeys;

impl KeyProvider for UnavailableKeys {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ES256
    }

    fn encoding_key(&self) -> Result<&EncodingKey, Error> {
        Err(Error::SignatureKeyUnavailable("hsm offline".to_string()))
    }

    fn decoding_key(&self) -> Result<&DecodingKey<'static>, Error> {
        Err(Error::SignatureKeyUnavailable("hsm offline".to_string()))
    }
}

pub fn pem_keys() -> PemKeyProvider {
    PemKeyProvider::from_pem(
        include_bytes!("../../testdata/es256-private.pem"),
        include_bytes!("../../testdata/es256-public.pem"),
    )
    .unwrap()
}

pub fn hasher() -> HashingService {
    HashingService::with_secret_key("test-pepper".to_string())
}

pub fn client(hasher: &HashingService) -> Client {
    Client {
        id: ClientId(CLIENT_ID.to_string()),
        name: "Client One".to_string(),
        secret: hasher
            .hash(&ClientSecret(CLIENT_SECRET.to_string()))
            .unwrap(),
        allowed_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
            .into_iter()
            .collect(),
        redirect_uris: vec![RedirectUri(REDIRECT_URI.to_string())]
            .into_iter()
            .collect(),
        post_logout_redirect_uris: vec![RedirectUri(POST_LOGOUT_URI.to_string())]
            .into_iter()
            .collect(),
        allowed_scopes: Scope::from_delimited_parts("openid profile"),
        require_consent: false,
        require_pkce: false,
        rotate_refresh_tokens: true,
    }
}

fn users(hasher: &HashingService) -> Vec<StaticUser> {
    let mut claims = Map::new();
    claims.insert("name".to_string(), Value::from("Alice"));
    claims.insert("email".to_string(), Value::from("alice@example.com"));
    claims.insert("phone_number".to_string(), Value::from("+1 555 0100"));

    vec![StaticUser {
        username: "alice".to_string(),
        subject: "sub-alice".to_string(),
        password_hash: hasher.hash_str("wonderland").unwrap(),
        claims,
    }]
}

pub async fn fixture() -> Fixture {
    fixture_with(Options::default()).await
}

pub async fn fixture_with(options: Options) -> Fixture {
    let hasher = hasher();
    let store = Arc::new(MemoryStore::new());

    store
        .upsert_identity_resource(&IdentityResource {
            name: "openid".to_string(),
            display_name: None,
            claims: vec!["sub".to_string()],
        })
        .await
        .unwrap();
    store
        .upsert_identity_resource(&IdentityResource {
            name: "profile".to_string(),
            display_name: Some("User profile".to_string()),
            claims: vec!["name".to_string(), "email".to_string()],
        })
        .await
        .unwrap();
    store
        .upsert_api_scope(&ApiScope {
            name: "api1".to_string(),
            display_name: Some("My API".to_string()),
        })
        .await
        .unwrap();
    store.upsert_client(&options.client).await.unwrap();

    let identity = StaticIdentityProvider::new(users(&hasher), hasher.clone());
    let token = TokenService::new(options.keys, ISSUER.to_string(), Duration::from_secs(900));

    let provider = OAuth2Provider::new(
        store.clone(),
        store.clone(),
        Arc::new(identity),
        token,
        hasher,
        options.settings,
    );

    Fixture {
        provider: Arc::new(provider),
        store,
    }
}

pub fn alice() -> Option<UserCredentials> {
    Some(UserCredentials {
        username: "alice".to_string(),
        password: "wonderland".to_string(),
    })
}

pub fn credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: ClientId(CLIENT_ID.to_string()),
        client_secret: ClientSecret(CLIENT_SECRET.to_string()),
    }
}

pub fn authorization_request(scope: &str) -> AuthorizationRequest {
    AuthorizationRequest {
        response_type: "code".to_string(),
        client_id: ClientId(CLIENT_ID.to_string()),
        redirect_uri: RedirectUri(REDIRECT_URI.to_string()),
        scope: Scope::from_delimited_parts(scope),
        state: Some("xyz".to_string()),
        nonce: None,
        prompt: None,
        pkce_challenge: None,
    }
}

pub async fn authorize(fixture: &Fixture, scope: &str) -> AuthCode {
    let redirect = fixture
        .provider
        .authorization_request(authorization_request(scope), alice())
        .await
        .unwrap();
    redirect.params.code().clone()
}

pub fn code_request(code: &AuthCode, verifier: Option<&str>) -> TokenRequest {
    TokenRequest::AuthorizationCode(AuthorizationCodeTokenRequest {
        redirect_uri: RedirectUri(REDIRECT_URI.to_string()),
        code: code.clone(),
        pkce_verifier: verifier.map(|v| pkce::Verifier {
            value: v.to_string(),
        }),
    })
}

pub async fn exchange(
    fixture: &Fixture,
    code: &AuthCode,
) -> Result<AccessTokenResponse, AccessTokenError> {
    fixture
        .provider
        .access_token_request(credentials(), code_request(code, None))
        .await
}
