use std::collections::HashSet;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use gatekeep_core::ServerConfig;
use gatekeep_server::auth::Role;
use gatekeep_server::auth::operator::sign_operator_token;
use gatekeep_server::server::{AppState, build_router};
use gatekeep_server::storage::GateDatabase;

const OPERATOR_SECRET: &str = "integration-operator-secret";
const MAC: &str = "AC:DE:48:00:11:22";

fn config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.device_token_secret = "integration-device-secret".into();
    config.auth.operator_token_secret = OPERATOR_SECRET.into();
    config
}

async fn app() -> Router {
    let db = GateDatabase::open_in_memory().await.unwrap();
    build_router(AppState::new(db, &config()))
}

fn manager() -> String {
    let token = sign_operator_token(OPERATOR_SECRET.as_bytes(), "mgr", Role::Manager, 300).unwrap();
    format!("Bearer {token}")
}

/// Send a request to the app and return (status, JSON body).
async fn call(
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

async fn register(app: &Router, mac: &str) -> (String, Value) {
    let (status, body) = call(app, "POST", "/register", None, Some(json!({"macAddress": mac}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let bearer = format!("Bearer {}", body["jwtToken"].as_str().unwrap());
    (bearer, body)
}

fn beep(repeat: u32) -> Value {
    json!({"name": "SET_FAIL_BEEP", "payload": {"duration": 80, "repeat": repeat}})
}

async fn queue(app: &Router, mac: &str, commands: Vec<Value>) {
    let (status, body) = call(
        app,
        "POST",
        "/commands/queue",
        Some(&manager()),
        Some(json!({"macAddress": mac, "commands": commands})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn poll_delivers_queue_in_order_then_only_fetch_logs() {
    let app = app().await;
    let (device, _) = register(&app, MAC).await;
    queue(&app, MAC, vec![beep(1), beep(2), beep(3)]).await;

    let (status, first) = call(&app, "GET", "/commands", Some(&device), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        first,
        json!([
            {"name": "SET_FAIL_BEEP", "payload": {"duration": 80, "repeat": 1}},
            {"name": "SET_FAIL_BEEP", "payload": {"duration": 80, "repeat": 2}},
            {"name": "SET_FAIL_BEEP", "payload": {"duration": 80, "repeat": 3}},
            {"name": "FETCH_LOGS", "payload": {}}
        ])
    );

    let (_, second) = call(&app, "GET", "/commands", Some(&device), None).await;
    assert_eq!(second, json!([{"name": "FETCH_LOGS", "payload": {}}]));
}

#[tokio::test]
async fn re_registering_is_idempotent() {
    let app = app().await;
    let (first, _) = register(&app, MAC).await;
    queue(&app, MAC, vec![beep(1)]).await;
    let (second, body) = register(&app, "ac-de-48-00-11-22").await;

    // Both tokens name the same device and the snapshot left the queue alone.
    assert_eq!(body["initialCommands"].as_array().unwrap().len(), 1);
    let (_, polled) = call(&app, "GET", "/commands", Some(&first), None).await;
    assert_eq!(polled.as_array().unwrap().len(), 2);
    let (_, polled) = call(&app, "GET", "/commands", Some(&second), None).await;
    assert_eq!(polled.as_array().unwrap().len(), 1);

    let admin = format!(
        "Bearer {}",
        sign_operator_token(OPERATOR_SECRET.as_bytes(), "boss", Role::Boss, 60).unwrap()
    );
    let (status, device) = call(&app, "GET", &format!("/devices/{MAC}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device["macAddress"], MAC);
}

#[tokio::test]
async fn allowed_entry_moves_card_inside_and_keeps_start_time() {
    let app = app().await;
    let (device, _) = register(&app, MAC).await;

    let scan = json!([{"cardId": 4242, "userId": 17, "attempt": 0, "timestamp": 1_700_000_000}]);
    let (status, _) = call(&app, "POST", "/logs", Some(&device), Some(scan.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, first) = call(&app, "GET", "/occupancy/4242", Some(&manager()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["isInsideWorkplace"], true);
    assert_eq!(first["userId"], 17);
    assert!(first["startTime"].is_i64());

    call(&app, "POST", "/logs", Some(&device), Some(scan)).await;
    let (_, second) = call(&app, "GET", "/occupancy/4242", Some(&manager()), None).await;
    assert_eq!(second["startTime"], first["startTime"]);
}

#[tokio::test]
async fn invalid_attempt_persists_nothing() {
    let app = app().await;
    let (device, _) = register(&app, MAC).await;

    let batch = json!([
        {"cardId": 1, "userId": 1, "attempt": 0, "timestamp": 10},
        {"cardId": 2, "userId": 2, "attempt": 9, "timestamp": 11}
    ]);
    let (status, body) = call(&app, "POST", "/logs", Some(&device), Some(batch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (_, logs) = call(&app, "GET", "/logs", Some(&manager()), None).await;
    assert_eq!(logs["total"], 0);
    let (status, _) = call(&app, "GET", "/occupancy/1", Some(&manager()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pagination_over_twenty_five_logs() {
    let app = app().await;
    let (device, _) = register(&app, MAC).await;
    let batch: Vec<Value> = (0..25)
        .map(|i| json!({"cardId": 9, "userId": 3, "attempt": 3, "timestamp": 1_000 + i}))
        .collect();
    let (status, _) = call(&app, "POST", "/logs", Some(&device), Some(Value::Array(batch))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, page1) = call(&app, "GET", "/logs?page=1&limit=10", Some(&manager()), None).await;
    assert_eq!(page1["data"].as_array().unwrap().len(), 10);
    assert_eq!(page1["total"], 25);
    assert_eq!(page1["data"][0]["timestamp"], 1_024);

    let (_, page3) = call(&app, "GET", "/logs?page=3&limit=10", Some(&manager()), None).await;
    assert_eq!(page3["data"].as_array().unwrap().len(), 5);
    assert_eq!(page3["page"], 3);
    assert_eq!(page3["limit"], 10);

    let (_, by_card) = call(&app, "GET", "/logs/by-card?cardId=9&limit=5", Some(&manager()), None).await;
    assert_eq!(by_card["total"], 25);
    assert_eq!(by_card["data"].as_array().unwrap().len(), 5);

    let (_, by_user) = call(&app, "GET", "/logs/by-user?userId=4", Some(&manager()), None).await;
    assert_eq!(by_user["total"], 0);
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_polls_never_double_deliver() {
    let dir = tempfile::tempdir().unwrap();
    let db = GateDatabase::open(&dir.path().join("gate.db")).await.unwrap();
    let app = build_router(AppState::new(db, &config()));

    let (device, _) = register(&app, MAC).await;
    let commands: Vec<Value> = (1..=40).map(beep).collect();
    queue(&app, MAC, commands).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let device = device.clone();
        handles.push(tokio::spawn(async move {
            let (status, body) = call(&app, "GET", "/commands", Some(&device), None).await;
            assert_eq!(status, StatusCode::OK);
            body.as_array().unwrap().clone()
        }));
    }

    let mut seen = HashSet::new();
    let mut delivered = 0;
    for handle in handles {
        let body = handle.await.unwrap();
        assert_eq!(body.last().unwrap()["name"], "FETCH_LOGS");
        for cmd in &body[..body.len() - 1] {
            let repeat = cmd["payload"]["repeat"].as_u64().unwrap();
            assert!(seen.insert(repeat), "command {repeat} delivered twice");
            delivered += 1;
        }
    }
    assert_eq!(delivered, 40);
}
