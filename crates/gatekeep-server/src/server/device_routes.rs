//! Routes called by terminals.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use gatekeep_core::wire::{
    CommandDto, LogEntryInput, LogRecord, RegisterRequest, RegisterResponse, TokenResponse,
};
use tracing::instrument;

use super::AppState;
use super::extract::{DeviceAuth, JsonBody};
use crate::error::GateError;

/// `POST /register` -- no credentials; idempotent per hardware address.
#[instrument(skip_all, fields(mac = %req.mac_address))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<RegisterResponse>, GateError> {
    Ok(Json(state.dispatcher.register(&req.mac_address).await?))
}

/// `POST /token/refresh`
#[instrument(skip_all, fields(mac = %mac))]
pub async fn refresh_token(
    State(state): State<AppState>,
    DeviceAuth(mac): DeviceAuth,
) -> Result<Json<TokenResponse>, GateError> {
    Ok(Json(state.dispatcher.refresh_token(&mac).await?))
}

/// `GET /commands` -- the poll.
#[instrument(skip_all, fields(mac = %mac))]
pub async fn poll_commands(
    State(state): State<AppState>,
    DeviceAuth(mac): DeviceAuth,
) -> Result<Json<Vec<CommandDto>>, GateError> {
    Ok(Json(state.dispatcher.poll(&mac).await?))
}

/// `POST /logs` -- a batch of access attempts, stored all-or-nothing.
#[instrument(skip_all, fields(mac = %mac, count = batch.len()))]
pub async fn upload_logs(
    State(state): State<AppState>,
    DeviceAuth(mac): DeviceAuth,
    JsonBody(batch): JsonBody<Vec<LogEntryInput>>,
) -> Result<(StatusCode, Json<Vec<LogRecord>>), GateError> {
    let records = state.logs.ingest(&mac, &batch).await?;
    Ok((StatusCode::CREATED, Json(records)))
}
