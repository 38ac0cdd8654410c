//! Server error taxonomy and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gatekeep_core::wire::ErrorBody;
use tracing::warn;

use crate::auth::TokenError;
use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("{0}")]
    Auth(String),

    /// Authenticated operator lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// Transient or internal failure; callers may retry.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl GateError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for GateError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for GateError {
    fn from(e: sqlx::Error) -> Self {
        DatabaseError::from(e).into()
    }
}

impl From<gatekeep_core::Error> for GateError {
    fn from(e: gatekeep_core::Error) -> Self {
        match e {
            gatekeep_core::Error::Validation(msg) => Self::Validation(msg),
            gatekeep_core::Error::Json(e) => Self::Validation(e.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<TokenError> for GateError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => Self::Storage(msg),
            other => Self::Auth(other.to_string()),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Storage(detail) => {
                warn!(error = %detail, "Request failed with internal error");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.kind().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
