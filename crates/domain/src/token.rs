use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;

pub const TOKEN_LENGTH: usize = 5;

/// Characters a shared token may never contain.
const FORBIDDEN_TOKEN_CHARS: &str = "!@#$%^&*()_+{}|:<>?~`-=[]\\;',./";

/// Short identifier respondents use to reach a survey.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurveyToken(String);

impl SurveyToken {
    /// Boundary check applied before any store lookup.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let forbidden = |ch: char| FORBIDDEN_TOKEN_CHARS.contains(ch);
        if raw.len() != TOKEN_LENGTH || raw.contains(forbidden) {
            return Err(DomainError::BadToken);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurveyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SurveyToken {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SurveyToken> for String {
    fn from(token: SurveyToken) -> Self {
        token.0
    }
}

/// Produces candidate tokens. Uniqueness is not its concern: the store
/// rejects a taken token at insert time and the caller asks again.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self) -> SurveyToken;
}

/// Draws every character uniformly from `[0-9a-zA-Z]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokenIssuer;

impl TokenIssuer for RandomTokenIssuer {
    fn issue(&self) -> SurveyToken {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect::<String>();
        SurveyToken(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_five_alphanumerics() {
        let issuer = RandomTokenIssuer;
        for _ in 0..1_000 {
            let token = issuer.issue();
            assert_eq!(token.as_str().len(), TOKEN_LENGTH);
            assert!(token.as_str().chars().all(|ch| ch.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn issued_tokens_pass_the_boundary_check() {
        let token = RandomTokenIssuer.issue();
        assert_eq!(SurveyToken::parse(token.as_str()).expect("valid"), token);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(matches!(SurveyToken::parse("abcd"), Err(DomainError::BadToken)));
        assert!(matches!(SurveyToken::parse("abcdef"), Err(DomainError::BadToken)));
        assert!(matches!(SurveyToken::parse(""), Err(DomainError::BadToken)));
    }

    #[test]
    fn parse_rejects_punctuation() {
        for raw in ["ab$cd", "a.bcd", "abc/d", "ab-cd", "a\\bcd", "ab`cd", "a'bcd"] {
            assert!(
                matches!(SurveyToken::parse(raw), Err(DomainError::BadToken)),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn deserialize_runs_the_boundary_check() {
        let token: SurveyToken = serde_json::from_str("\"aPdlq\"").expect("token");
        assert_eq!(token.as_str(), "aPdlq");
        assert!(serde_json::from_str::<SurveyToken>("\"a#dlq\"").is_err());
    }
}
