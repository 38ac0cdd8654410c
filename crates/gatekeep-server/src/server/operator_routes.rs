//! Routes called by operators and the dashboard.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use gatekeep_core::wire::{
    DeviceView, LogRecord, OccupancyView, Page, QueueCommandsRequest, QueueCommandsResponse,
};
use gatekeep_core::{CredentialId, MacAddress};
use serde::Deserialize;
use tracing::{info, instrument};

use super::AppState;
use super::extract::{JsonBody, OperatorAuth, QueryParams};
use crate::auth::Role;
use crate::error::GateError;
use crate::ingest::PageRequest;
use crate::storage::LogFilter;

const QUEUE_ROLES: &[Role] = &[Role::Boss, Role::Manager];
const READ_ROLES: &[Role] = &[Role::Boss, Role::Clerk, Role::Manager];

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLogQuery {
    pub user_id: CredentialId,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLogQuery {
    pub card_id: CredentialId,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `POST /commands/queue`
#[instrument(skip_all, fields(operator = %auth.0.subject))]
pub async fn queue_commands(
    State(state): State<AppState>,
    auth: OperatorAuth,
    JsonBody(req): JsonBody<QueueCommandsRequest>,
) -> Result<(StatusCode, Json<QueueCommandsResponse>), GateError> {
    auth.require(QUEUE_ROLES)?;
    let mac = MacAddress::parse(&req.mac_address)?;
    if req.commands.is_empty() {
        return Err(GateError::Validation("commands must not be empty".into()));
    }

    let command_ids = state.queue.enqueue_batch(&mac, &req.commands).await?;
    info!(mac = %mac, count = command_ids.len(), "Operator queued commands");

    Ok((
        StatusCode::CREATED,
        Json(QueueCommandsResponse {
            queued: command_ids.len(),
            command_ids,
        }),
    ))
}

/// `GET /logs`
pub async fn list_logs(
    State(state): State<AppState>,
    auth: OperatorAuth,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Page<LogRecord>>, GateError> {
    auth.require(READ_ROLES)?;
    let page = PageRequest::new(query.page, query.limit)?;
    Ok(Json(state.logs.list(LogFilter::All, page).await?))
}

/// `GET /logs/by-user?userId=`
pub async fn list_logs_by_user(
    State(state): State<AppState>,
    auth: OperatorAuth,
    QueryParams(query): QueryParams<UserLogQuery>,
) -> Result<Json<Page<LogRecord>>, GateError> {
    auth.require(READ_ROLES)?;
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = LogFilter::User(query.user_id.get());
    Ok(Json(state.logs.list(filter, page).await?))
}

/// `GET /logs/by-card?cardId=`
pub async fn list_logs_by_card(
    State(state): State<AppState>,
    auth: OperatorAuth,
    QueryParams(query): QueryParams<CardLogQuery>,
) -> Result<Json<Page<LogRecord>>, GateError> {
    auth.require(READ_ROLES)?;
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = LogFilter::Card(query.card_id.get());
    Ok(Json(state.logs.list(filter, page).await?))
}

/// `GET /devices/{mac}` -- registration info and command sync status.
pub async fn device_status(
    State(state): State<AppState>,
    auth: OperatorAuth,
    Path(raw_mac): Path<String>,
) -> Result<Json<DeviceView>, GateError> {
    auth.require(READ_ROLES)?;
    let mac = MacAddress::parse(&raw_mac)?;
    let device = state.registry.find_by_id(&mac).await?;
    let sync = state.registry.sync_status(&mac).await?;
    Ok(Json(DeviceView {
        mac_address: mac,
        registered_at: device.registered_at,
        last_seen: device.last_seen,
        sync,
    }))
}

/// `GET /occupancy/{card_id}`
pub async fn get_occupancy(
    State(state): State<AppState>,
    auth: OperatorAuth,
    Path(raw_card): Path<String>,
) -> Result<Json<OccupancyView>, GateError> {
    auth.require(READ_ROLES)?;
    let card: CredentialId = raw_card.parse()?;
    Ok(Json(state.occupancy.get(card.get()).await?))
}

/// `POST /occupancy/{card_id}/exit`
#[instrument(skip_all, fields(operator = %auth.0.subject, card = %raw_card))]
pub async fn exit_occupancy(
    State(state): State<AppState>,
    auth: OperatorAuth,
    Path(raw_card): Path<String>,
) -> Result<Json<OccupancyView>, GateError> {
    auth.require(READ_ROLES)?;
    let card: CredentialId = raw_card.parse()?;
    Ok(Json(state.occupancy.exit(card.get()).await?))
}

/// `POST /occupancy/{card_id}/reset`
#[instrument(skip_all, fields(operator = %auth.0.subject, card = %raw_card))]
pub async fn reset_occupancy(
    State(state): State<AppState>,
    auth: OperatorAuth,
    Path(raw_card): Path<String>,
) -> Result<Json<OccupancyView>, GateError> {
    auth.require(READ_ROLES)?;
    let card: CredentialId = raw_card.parse()?;
    Ok(Json(state.occupancy.reset(card.get()).await?))
}
