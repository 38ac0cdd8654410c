//! Device token issuance and validation.
//!
//! A device token binds a terminal's hardware address to a session. It is
//! verified statelessly on every poll, so no session table is consulted.

use gatekeep_core::MacAddress;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in device tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceClaims {
    /// Normalized hardware address of the device.
    pub id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("missing authorization header")]
    Missing,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Absolute expiry for a token issued at `now`.
pub(crate) fn expires_at(now: i64, ttl_secs: i64) -> Result<i64, TokenError> {
    now.checked_add(ttl_secs)
        .ok_or_else(|| TokenError::Signing(format!("token lifetime {ttl_secs}s is out of range")))
}

/// Mints and verifies device tokens with the device secret.
#[derive(Clone)]
pub struct DeviceTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl DeviceTokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `device`. Returns the token and its lifetime in
    /// seconds.
    pub fn issue(&self, device: &MacAddress) -> Result<(String, i64), TokenError> {
        let now = gatekeep_core::db::unix_timestamp();
        let claims = DeviceClaims {
            id: device.to_string(),
            iat: now,
            exp: expires_at(now, self.ttl_secs)?,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, self.ttl_secs))
    }

    /// Validate a token and return the device it was issued to.
    pub fn verify(&self, token: &str) -> Result<MacAddress, TokenError> {
        let data = jsonwebtoken::decode::<DeviceClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        MacAddress::parse(&data.claims.id).map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
