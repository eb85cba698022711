use serde_json::{Map, Value};

use crate::{
    auth::pkce::Transformation,
    core::models::Resources,
    oidc::DiscoveryDocument,
};

use super::{Error, OAuth2Provider};

/// Claims the token service sets itself. User claims never override them.
const RESERVED_CLAIMS: &[&str] = &[
    "iss", "sub", "aud", "exp", "iat", "nbf", "auth_time", "nonce", "azp", "jti",
];

/// Keeps the user claims released by the granted identity resources.
pub fn filter_claims(claims: Map<String, Value>, resources: &Resources) -> Map<String, Value> {
    let released: Vec<&str> = resources.claim_names().collect();

    claims
        .into_iter()
        .filter(|(name, _)| {
            released.contains(&name.as_str()) && !RESERVED_CLAIMS.contains(&name.as_str())
        })
        .collect()
}

impl OAuth2Provider {
    pub async fn discovery_document(&self, public_url: &str) -> Result<DiscoveryDocument, Error> {
        let base = public_url.trim_end_matches('/');
        let resources = self.config.list_resources().await?;

        let mut claims_supported: Vec<String> = resources
            .claim_names()
            .map(ToString::to_string)
            .collect();
        claims_supported.sort();
        claims_supported.dedup();

        let pkce_methods = [Transformation::Plain, Transformation::S256]
            .iter()
            .map(|t| match t {
                Transformation::Plain => "plain",
                Transformation::S256 => "S256",
            })
            .collect();

        Ok(DiscoveryDocument {
            issuer: self.token.issuer().to_string(),
            authorization_endpoint: format!("{}/authorize", base),
            token_endpoint: format!("{}/token", base),
            revocation_endpoint: format!("{}/revoke", base),
            end_session_endpoint: format!("{}/endsession", base),
            scopes_supported: resources.names().as_parts(),
            claims_supported,
            response_types_supported: vec!["code"],
            grant_types_supported: vec!["authorization_code", "refresh_token"],
            subject_types_supported: vec!["public"],
            token_endpoint_auth_methods_supported: vec!["client_secret_basic", "client_secret_post"],
            code_challenge_methods_supported: pkce_methods,
            id_token_signing_alg_values_supported: vec![format!("{:?}", self.token.algorithm())],
        })
    }
}
