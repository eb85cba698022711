use std::{
    collections::BTreeSet,
    convert::TryInto,
    fmt,
    str::FromStr,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(format!("unknown grant type {}", other)),
        }
    }
}

/// A set of scope names, carried on the wire as a single space-delimited
/// string. Kept sorted so the joined form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope(BTreeSet<String>);

impl Scope {
    pub fn from_parts(parts: Vec<String>) -> Self {
        let set = parts.into_iter().filter(|p| !p.is_empty()).collect();
        Self(set)
    }

    pub fn from_delimited_parts(parts: &str) -> Self {
        let parts = parts.split_whitespace().map(ToString::to_string).collect();
        Self(parts)
    }

    pub fn as_joined(&self) -> String {
        self.0
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ")
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn as_parts(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    pub fn borrow_parts(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(AsRef::as_ref)
    }

    pub fn contains_all(&self, other: &Scope) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Parts of `self` that `allowed` does not contain.
    pub fn difference(&self, allowed: &Scope) -> Scope {
        Self(self.0.difference(&allowed.0).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_joined())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = String::deserialize(deserializer)?;
        Ok(Self::from_delimited_parts(&parts))
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let joined = self.as_joined();
        serializer.serialize_str(&joined)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl FromStr for ClientId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compared byte-for-byte. No normalisation of trailing slashes, case or
/// query strings ever happens.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RedirectUri(pub String);

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(pub String);

impl AsRef<str> for ClientSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct HashedClientSecret(pub String);

impl From<String> for HashedClientSecret {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for HashedClientSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct AuthCode(pub String);

impl AsRef<str> for AuthCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl AsRef<str> for RefreshToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Digest of an authorization code or refresh token. Only digests reach the
/// grant store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct GrantHandle(pub String);

impl From<String> for GrantHandle {
    fn from(from: String) -> Self {
        Self(from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

#[derive(Debug, Clone)]
pub struct Expiry(SystemTime);

impl Expiry {
    pub fn from_now(ttl: Duration) -> Self {
        let time = SystemTime::now()
            .checked_add(ttl)
            .unwrap_or_else(SystemTime::now);
        Self(time)
    }

    pub fn as_unix_secs(&self) -> i64 {
        unix_secs(self.0)
    }
}

impl From<Expiry> for i64 {
    fn from(expiry: Expiry) -> i64 {
        expiry.as_unix_secs()
    }
}

fn unix_secs(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
        .try_into()
        .unwrap_or(i64::MAX)
}

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    unix_secs(SystemTime::now())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scope_is_joined_in_sorted_order() {
        let scope = Scope::from_delimited_parts("profile  openid api1");
        assert_eq!(scope.as_joined(), "api1 openid profile");
        assert_eq!(scope, Scope::from_delimited_parts("openid api1 profile"));
    }

    #[test]
    fn scope_difference_lists_missing_parts() {
        let requested = Scope::from_delimited_parts("openid profile email");
        let allowed = Scope::from_delimited_parts("openid profile");
        assert!(!allowed.contains_all(&requested));
        assert_eq!(requested.difference(&allowed).as_joined(), "email");
    }

    #[test]
    fn redirect_uris_compare_byte_for_byte() {
        let registered = RedirectUri("https://a.example/cb".to_string());
        assert_ne!(registered, RedirectUri("https://a.example/cb/".to_string()));
        assert_ne!(registered, RedirectUri("https://a.example/cb?x=1".to_string()));
        assert_ne!(registered, RedirectUri("HTTPS://a.example/cb".to_string()));
        assert_eq!(registered, RedirectUri("https://a.example/cb".to_string()));
    }

    #[test]
    fn expiry_is_in_the_future() {
        let expiry = Expiry::from_now(Duration::from_secs(60));
        assert!(expiry.as_unix_secs() >= unix_now() + 59);
    }
}
