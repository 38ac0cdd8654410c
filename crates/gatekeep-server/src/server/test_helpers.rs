//! Shared helpers for the route test modules.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gatekeep_core::ServerConfig;
use serde_json::Value;
use tower::ServiceExt;

use super::{AppState, build_router};
use crate::auth::Role;
use crate::auth::operator::sign_operator_token;
use crate::auth::password::hash_password;
use crate::storage::GateDatabase;

pub const ADMIN_PASSWORD: &str = "correct horse";
const OPERATOR_SECRET: &str = "route-test-operator-secret";

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.device_token_secret = "route-test-device-secret".into();
    config.auth.operator_token_secret = OPERATOR_SECRET.into();
    config.auth.admin_password_hash = Some(hash_password(ADMIN_PASSWORD).unwrap());
    config
}

/// A router over a fresh in-memory database.
pub async fn test_app() -> (Router, AppState) {
    let db = GateDatabase::open_in_memory().await.unwrap();
    let state = AppState::new(db, &test_config());
    (build_router(state.clone()), state)
}

pub fn operator_bearer(role: Role) -> String {
    let token = sign_operator_token(OPERATOR_SECRET.as_bytes(), "tester", role, 300).unwrap();
    format!("Bearer {token}")
}

pub fn admin_basic() -> String {
    format!("Basic {}", STANDARD.encode(format!("admin:{ADMIN_PASSWORD}")))
}

/// Send a request and return (status, JSON body). Empty bodies become `Null`.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register `mac` and return a `Bearer` header value for it.
pub async fn register_device(app: &Router, mac: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/register",
        None,
        Some(serde_json::json!({"macAddress": mac})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    format!("Bearer {}", body["jwtToken"].as_str().unwrap())
}
