use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub enum Transformation {
    #[serde(rename = "plain")]
    Plain,
    S256,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::Plain
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Challenge {
    #[serde(rename = "code_challenge")]
    pub code: String,
    #[serde(rename = "code_challenge_method")]
    #[serde(default)]
    pub method: Transformation,
}

#[derive(Debug, Clone)]
#[derive(serde::Deserialize)]
pub struct Verifier {
    #[serde(rename = "code_verifier")]
    pub value: String,
}

/// Checks a token request's verifier against the challenge stored with the
/// code. A stored challenge without a verifier never passes.
pub fn verify(challenge: &Challenge, verifier: Option<&Verifier>) -> bool {
    let verifier = match verifier {
        Some(v) => v,
        None => return false,
    };

    match challenge.method {
        Transformation::Plain => challenge.code == verifier.value,
        Transformation::S256 => {
            let digest = Sha256::digest(verifier.value.as_bytes());
            base64::encode_config(digest, base64::URL_SAFE_NO_PAD) == challenge.code
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn verifier(value: &str) -> Verifier {
        Verifier {
            value: value.to_string(),
        }
    }

    #[test]
    fn s256_matches_rfc7636_example() {
        let challenge = Challenge {
            code: "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string(),
            method: Transformation::S256,
        };
        let good = verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        let bad = verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXl");

        assert!(verify(&challenge, Some(&good)));
        assert!(!verify(&challenge, Some(&bad)));
    }

    #[test]
    fn plain_compares_verbatim() {
        let challenge = Challenge {
            code: "abc".to_string(),
            method: Transformation::Plain,
        };
        assert!(verify(&challenge, Some(&verifier("abc"))));
        assert!(!verify(&challenge, Some(&verifier("ABC"))));
    }

    #[test]
    fn missing_verifier_fails() {
        let challenge = Challenge {
            code: "abc".to_string(),
            method: Transformation::default(),
        };
        assert!(!verify(&challenge, None));
    }
}
