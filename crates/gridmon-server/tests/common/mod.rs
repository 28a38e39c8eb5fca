#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use gridmon_analytics::RuleBasedPredictor;
use gridmon_common::types::{Connection, ConnectionStatus, ConnectionType};
use gridmon_server::app;
use gridmon_server::config::ServerConfig;
use gridmon_server::state::{build_generator, AppState};
use gridmon_storage::engine::SqliteStorageEngine;
use gridmon_storage::StorageEngine;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context() -> Result<TestContext> {
    gridmon_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let config = ServerConfig {
        db_path: temp_dir
            .path()
            .join("gridmon.db")
            .to_string_lossy()
            .to_string(),
        ..ServerConfig::default()
    };

    let storage = Arc::new(SqliteStorageEngine::open(std::path::Path::new(
        &config.db_path,
    ))?);
    let generator = Arc::new(build_generator(&config));

    let state = AppState {
        storage,
        predictor: Arc::new(RuleBasedPredictor),
        generator,
        config: Arc::new(config),
        start_time: Utc::now(),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub fn seed_connection(state: &AppState, name: &str, nominal_voltage: f64) -> Connection {
    let now = Utc::now();
    let connection = Connection {
        id: gridmon_common::id::next_id(),
        name: name.to_string(),
        connection_type: ConnectionType::Substation,
        nominal_voltage,
        status: ConnectionStatus::Connected,
        created_at: now,
        updated_at: now,
    };
    state.storage.insert_connection(&connection).unwrap();
    connection
}

/// Sends a request without a body and returns (status, parsed JSON body,
/// X-Trace-Id header if present).
pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    path: &str,
) -> (StatusCode, Value, Option<String>) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Sends a request with a JSON body.
pub async fn request_json(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Value,
) -> (StatusCode, Value, Option<String>) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let trace = response
        .headers()
        .get("X-Trace-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body, trace)
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "expected success envelope: {body}");
    assert_eq!(body["err_msg"], "success");
}

pub fn assert_err_envelope(body: &Value, err_code: i64) {
    assert_eq!(body["err_code"], err_code, "unexpected envelope: {body}");
    assert!(body["data"].is_null());
}
