//! HTTP surface of the Gatekeep server.
//!
//! Device routes authenticate with device tokens; operator routes accept
//! the admin Basic credential or an operator bearer token and check roles
//! per handler.

pub mod device_routes;
pub mod extract;
pub mod health;
pub mod operator_routes;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_helpers;



use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gatekeep_core::ServerConfig;
use tower_http::trace::TraceLayer;

use crate::auth::{DeviceTokenIssuer, OperatorVerifier};
use crate::dispatch::Dispatcher;
use crate::ingest::{LogIngestor, OccupancyEngine};
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::storage::GateDatabase;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: GateDatabase,
    pub dispatcher: Dispatcher,
    pub queue: CommandQueue,
    pub registry: DeviceRegistry,
    pub logs: LogIngestor,
    pub occupancy: OccupancyEngine,
    pub device_tokens: DeviceTokenIssuer,
    pub operators: Arc<OperatorVerifier>,
}

impl AppState {
    pub fn new(db: GateDatabase, config: &ServerConfig) -> Self {
        let auth = &config.auth;
        let device_tokens = DeviceTokenIssuer::new(
            auth.device_token_secret.as_bytes(),
            auth.device_token_ttl_secs,
        );
        let operators = Arc::new(OperatorVerifier::new(
            auth.operator_token_secret.as_bytes(),
            auth.admin_username.clone(),
            auth.admin_password_hash.clone(),
        ));

        let registry = DeviceRegistry::new(db.clone());
        let queue = CommandQueue::new(db.clone());
        let dispatcher = Dispatcher::new(
            registry.clone(),
            queue.clone(),
            device_tokens.clone(),
            config.device_defaults.clone(),
        );

        Self {
            logs: LogIngestor::new(db.clone()),
            occupancy: OccupancyEngine::new(db.clone()),
            db,
            dispatcher,
            queue,
            registry,
            device_tokens,
            operators,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Device protocol
        .route("/register", post(device_routes::register))
        .route("/token/refresh", post(device_routes::refresh_token))
        .route("/commands", get(device_routes::poll_commands))
        .route(
            "/logs",
            post(device_routes::upload_logs).get(operator_routes::list_logs),
        )
        // Operator API
        .route("/commands/queue", post(operator_routes::queue_commands))
        .route("/logs/by-user", get(operator_routes::list_logs_by_user))
        .route("/logs/by-card", get(operator_routes::list_logs_by_card))
        .route("/devices/{mac}", get(operator_routes::device_status))
        .route("/occupancy/{card_id}", get(operator_routes::get_occupancy))
        .route(
            "/occupancy/{card_id}/exit",
            post(operator_routes::exit_occupancy),
        )
        .route(
            "/occupancy/{card_id}/reset",
            post(operator_routes::reset_occupancy),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
