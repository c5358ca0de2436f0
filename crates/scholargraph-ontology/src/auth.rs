//! Bearer credentials
//!
//! The client never stores a token: callers pass one on every operation and
//! it is checked here before anything touches the network.

use crate::error::{OntologyError, Result};
use std::fmt;

/// A validated, borrowed bearer token
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccessToken<'a>(&'a str);

impl<'a> AccessToken<'a> {
    /// Accept an opaque token string.
    ///
    /// Rejects empty tokens and anything that cannot travel verbatim in an
    /// `Authorization` header (whitespace, control or non-ASCII characters).
    pub fn parse(raw: &'a str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(OntologyError::Auth("access token is missing".to_string()));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || !c.is_ascii())
        {
            return Err(OntologyError::Auth(format!(
                "access token is malformed: contains {bad:?}"
            )));
        }
        Ok(Self(raw))
    }

    /// Extract the token from an inbound `Authorization: Bearer <token>` value
    pub fn from_authorization_header(header: &'a str) -> Result<Self> {
        let header = header.trim();
        let (scheme, rest) = header
            .split_once(' ')
            .ok_or_else(|| {
                OntologyError::Auth("authorization header has no bearer token".to_string())
            })?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(OntologyError::Auth(format!(
                "unsupported authorization scheme {scheme:?}"
            )));
        }
        Self::parse(rest.trim())
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }

    /// Value for the outbound `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(AccessToken::parse(""), Err(OntologyError::Auth(_))));
        assert!(matches!(AccessToken::parse("   "), Err(OntologyError::Auth(_))));
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(AccessToken::parse("Bearer abc").is_err());
        assert!(AccessToken::parse("abc\ndef").is_err());
        assert!(AccessToken::parse("tök").is_err());
    }

    #[test]
    fn test_header_value() {
        let token = AccessToken::parse("eyJhbGciOi.abc-123_x").unwrap();
        assert_eq!(token.header_value(), "Bearer eyJhbGciOi.abc-123_x");
    }

    #[test]
    fn test_from_authorization_header() {
        let token = AccessToken::from_authorization_header("Bearer tok-1").unwrap();
        assert_eq!(token.as_str(), "tok-1");

        let token = AccessToken::from_authorization_header("bearer   tok-2").unwrap();
        assert_eq!(token.as_str(), "tok-2");

        assert!(AccessToken::from_authorization_header("Basic dXNlcg==").is_err());
        assert!(AccessToken::from_authorization_header("Bearer").is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let token = AccessToken::parse("secret-value").unwrap();
        assert!(!format!("{token:?}").contains("secret"));
    }
}
