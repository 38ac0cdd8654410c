//! Operator identity and role checks.
//!
//! Operators authenticate either with the configured admin credential or
//! with a bearer token issued by the dashboard and signed with the operator
//! secret. Handlers decide access with [`authorize`].

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::TokenError;
use super::device_token::expires_at;
use super::password::verify_password;

/// Operator role. Numeric codes are shared with the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Boss,
    Clerk,
    Manager,
    Employee,
}

impl Role {
    pub const fn code(self) -> u8 {
        match self {
            Self::Boss => 1,
            Self::Clerk => 2,
            Self::Manager => 3,
            Self::Employee => 4,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Boss),
            2 => Ok(Self::Clerk),
            3 => Ok(Self::Manager),
            4 => Ok(Self::Employee),
            other => Err(format!("unknown role {other}")),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boss => "BOSS",
            Self::Clerk => "CLERK",
            Self::Manager => "MANAGER",
            Self::Employee => "EMPLOYEE",
        };
        f.write_str(name)
    }
}

/// An authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub subject: String,
    pub role: Role,
}

/// Claims of an operator bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorClaims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

/// Whether `operator` holds one of `allowed`.
pub fn authorize(operator: &Operator, allowed: &[Role]) -> bool {
    allowed.contains(&operator.role)
}

/// Verifies both kinds of operator credential.
#[derive(Clone)]
pub struct OperatorVerifier {
    decoding_key: DecodingKey,
    admin_username: String,
    admin_password_hash: Option<String>,
}

impl OperatorVerifier {
    pub fn new(
        secret: &[u8],
        admin_username: impl Into<String>,
        admin_password_hash: Option<String>,
    ) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            admin_username: admin_username.into(),
            admin_password_hash,
        }
    }

    pub fn verify_bearer(&self, token: &str) -> Result<Operator, TokenError> {
        let data = jsonwebtoken::decode::<OperatorClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        Ok(Operator {
            subject: data.claims.sub,
            role: data.claims.role,
        })
    }

    /// Check the admin credential. The admin always acts as `Boss`.
    ///
    /// Returns `None` when the credential does not match or Basic auth is
    /// disabled because no password hash is configured.
    pub fn verify_basic(&self, username: &str, password: &str) -> Option<Operator> {
        let hash = self.admin_password_hash.as_deref()?;
        if username != self.admin_username {
            return None;
        }
        match verify_password(password, hash) {
            Ok(true) => Some(Operator {
                subject: username.to_string(),
                role: Role::Boss,
            }),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Configured admin password hash is unreadable");
                None
            }
        }
    }

    /// [`Self::verify_basic`] on the blocking pool, keeping argon2 off the
    /// async workers.
    pub async fn verify_basic_blocking(
        &self,
        username: String,
        password: String,
    ) -> Result<Option<Operator>, tokio::task::JoinError> {
        let verifier = self.clone();
        tokio::task::spawn_blocking(move || verifier.verify_basic(&username, &password)).await
    }
}

/// Sign an operator token with the operator secret. The dashboard normally
/// does this; `gatekeep-server mint-token` exposes it for scripting.
pub fn sign_operator_token(
    secret: &[u8],
    subject: &str,
    role: Role,
    ttl_secs: i64,
) -> Result<String, TokenError> {
    let claims = OperatorClaims {
        sub: subject.to_string(),
        role,
        exp: expires_at(gatekeep_core::db::unix_timestamp(), ttl_secs)?,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}
