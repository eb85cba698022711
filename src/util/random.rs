use crate::core::types::{AuthCode, RefreshToken, TokenId};

use super::hash::Salt;

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for AuthCode {
    fn from_random() -> Self {
        AuthCode(random_string(64))
    }
}

impl FromRandom for RefreshToken {
    fn from_random() -> Self {
        RefreshToken(random_string(128))
    }
}

impl FromRandom for TokenId {
    fn from_random() -> Self {
        TokenId(random_string(32))
    }
}

impl FromRandom for Salt {
    fn from_random() -> Self {
        Salt(random_string(24))
    }
}

fn random_string(size: usize) -> String {
    use rand::Rng;

    let s: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(size)
        .map(|b| b as char)
        .collect();
    base64::encode_config(s, base64::URL_SAFE_NO_PAD)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_are_long_and_distinct() {
        let a = AuthCode::from_random();
        let b = AuthCode::from_random();
        // 64 alphanumerics carry ~380 bits of entropy.
        assert!(a.0.len() >= 64);
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn handles_are_url_safe() {
        let token = RefreshToken::from_random();
        assert!(token
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
