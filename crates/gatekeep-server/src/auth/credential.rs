//! `Authorization` header parsing.
//!
//! The header is parsed once into a [`Credential`] and each variant is
//! handed to its own verifier.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::TokenError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic { username: String, password: String },
}

impl Credential {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, TokenError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(TokenError::Missing)?
            .to_str()
            .map_err(|_| TokenError::Invalid("authorization header is not ASCII".into()))?;
        Self::parse(value)
    }

    /// Parse `<scheme> <value>`; the scheme is matched case-insensitively.
    pub fn parse(header: &str) -> Result<Self, TokenError> {
        let (scheme, rest) = header
            .trim()
            .split_once(' ')
            .ok_or_else(|| TokenError::Invalid("malformed authorization header".into()))?;
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(TokenError::Invalid("empty credential".into()));
        }

        if scheme.eq_ignore_ascii_case("bearer") {
            return Ok(Self::Bearer(rest.to_string()));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(rest)
                .map_err(|_| TokenError::Invalid("basic credential is not base64".into()))?;
            let decoded = String::from_utf8(decoded)
                .map_err(|_| TokenError::Invalid("basic credential is not UTF-8".into()))?;
            let (username, password) = decoded
                .split_once(':')
                .ok_or_else(|| TokenError::Invalid("basic credential lacks ':'".into()))?;
            return Ok(Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        Err(TokenError::Invalid(format!(
            "unsupported authorization scheme {scheme:?}"
        )))
    }
}
