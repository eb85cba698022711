pub mod types;
pub mod models;

use crate::core::types::Scope;

pub use models::{AccessTokenResponse, DiscoveryDocument};

pub const OPENID_SCOPE: &str = "openid";

impl Scope {
    pub fn has_openid(&self) -> bool {
        self.contains(OPENID_SCOPE)
    }
}
