//! Request extractors: authenticated callers and bodies whose rejections
//! use the server's error format.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use gatekeep_core::MacAddress;
use serde::de::DeserializeOwned;

use super::AppState;
use crate::auth::{Credential, Operator, Role, authorize};
use crate::error::GateError;

/// A device authenticated by its bearer token.
#[derive(Debug, Clone)]
pub struct DeviceAuth(pub MacAddress);

impl FromRequestParts<AppState> for DeviceAuth {
    type Rejection = GateError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Credential::from_headers(&parts.headers)? {
            Credential::Bearer(token) => Ok(Self(state.device_tokens.verify(&token)?)),
            Credential::Basic { .. } => Err(GateError::Auth(
                "devices must present a bearer token".into(),
            )),
        }
    }
}

/// An authenticated operator. Handlers still call [`OperatorAuth::require`].
#[derive(Debug, Clone)]
pub struct OperatorAuth(pub Operator);

impl OperatorAuth {
    pub fn require(&self, allowed: &[Role]) -> Result<&Operator, GateError> {
        if authorize(&self.0, allowed) {
            Ok(&self.0)
        } else {
            Err(GateError::Forbidden(format!(
                "role {} is not allowed to perform this action",
                self.0.role
            )))
        }
    }
}

impl FromRequestParts<AppState> for OperatorAuth {
    type Rejection = GateError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let operator = match Credential::from_headers(&parts.headers)? {
            Credential::Bearer(token) => state.operators.verify_bearer(&token)?,
            Credential::Basic { username, password } => state
                .operators
                .verify_basic_blocking(username, password)
                .await
                .map_err(|e| GateError::Storage(format!("credential check failed: {e}")))?
                .ok_or_else(|| GateError::Auth("invalid admin credentials".into()))?,
        };
        Ok(Self(operator))
    }
}

/// `Json<T>` whose rejection is a validation error.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = GateError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| GateError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query<T>` whose rejection is a validation error.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| GateError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}
