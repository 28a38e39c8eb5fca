use crate::logging::TraceId;
use crate::scheduler;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use gridmon_common::types::{Connection, ConnectionStatus, ConnectionType};
use gridmon_storage::StorageEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Error code (0 on success).
    pub err_code: i32,
    /// Error message ("success" on success).
    pub err_msg: String,
    /// Request trace ID, echoed from the logging middleware.
    pub trace_id: String,
    /// Payload, present on success.
    pub data: Option<T>,
}

#[derive(Serialize)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "internal_error" => 1500,
        "storage_error" => 1501,
        _ => 1999,
    }
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

fn storage_error(trace_id: &str, e: impl std::fmt::Display) -> Response {
    tracing::error!(error = %e, "Storage operation failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        trace_id,
        "storage_error",
        &e.to_string(),
    )
}

#[derive(Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

const MAX_PAGE_SIZE: usize = 200;

// ---- Health ----

#[derive(Serialize)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    storage_status: String,
}

pub async fn healthz(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state.storage.count_open_alerts() {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Storage health probe failed");
            "error".to_string()
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status,
        },
    )
}

// ---- Scheduler ----

/// Runs one pipeline round. Partial stage failure is still a 200 with
/// the per-stage error fields populated; only a round where every stage
/// failed comes back as a 500.
pub async fn run_scheduler(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let summary = scheduler::run_round(&state, Utc::now()).await;
    if summary.all_stages_failed() {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "internal_error",
            "all pipeline stages failed",
        );
    }
    success_response(StatusCode::OK, &trace_id, summary)
}

// ---- Connections ----

#[derive(Deserialize)]
pub struct CreateConnectionRequest {
    pub name: String,
    pub connection_type: ConnectionType,
    pub nominal_voltage: f64,
    #[serde(default)]
    pub status: Option<ConnectionStatus>,
}

pub async fn list_connections(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.storage.list_connections() {
        Ok(connections) => success_response(StatusCode::OK, &trace_id, connections),
        Err(e) => storage_error(&trace_id, e),
    }
}

pub async fn create_connection(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateConnectionRequest>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "name must not be empty",
        );
    }
    if req.nominal_voltage <= 0.0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "nominal_voltage must be positive",
        );
    }

    match state.storage.list_connections() {
        Ok(existing) if existing.iter().any(|c| c.name == name) => {
            return error_response(
                StatusCode::CONFLICT,
                &trace_id,
                "conflict",
                &format!("connection '{name}' already exists"),
            );
        }
        Err(e) => return storage_error(&trace_id, e),
        _ => {}
    }

    let now = Utc::now();
    let connection = Connection {
        id: gridmon_common::id::next_id(),
        name: name.to_string(),
        connection_type: req.connection_type,
        nominal_voltage: req.nominal_voltage,
        status: req.status.unwrap_or(ConnectionStatus::Connected),
        created_at: now,
        updated_at: now,
    };

    match state.storage.insert_connection(&connection) {
        Ok(()) => {
            tracing::info!(id = %connection.id, name = %connection.name, "Connection registered");
            success_response(StatusCode::CREATED, &trace_id, connection)
        }
        Err(e) => storage_error(&trace_id, e),
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ConnectionStatus,
}

pub async fn update_connection_status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    match state
        .storage
        .update_connection_status(&id, req.status, Utc::now())
    {
        Ok(true) => match state.storage.get_connection(&id) {
            Ok(Some(connection)) => success_response(StatusCode::OK, &trace_id, connection),
            Ok(None) => error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                &format!("connection '{id}' not found"),
            ),
            Err(e) => storage_error(&trace_id, e),
        },
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("connection '{id}' not found"),
        ),
        Err(e) => storage_error(&trace_id, e),
    }
}

// ---- Alerts ----

pub async fn active_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = params.limit.min(MAX_PAGE_SIZE);
    let alerts = match state.storage.list_open_alerts(limit, params.offset) {
        Ok(alerts) => alerts,
        Err(e) => return storage_error(&trace_id, e),
    };
    let total = match state.storage.count_open_alerts() {
        Ok(total) => total,
        Err(e) => return storage_error(&trace_id, e),
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        PaginatedData {
            items: alerts,
            total,
            limit,
            offset: params.offset,
        },
    )
}

// ---- Predictions ----

#[derive(Deserialize)]
pub struct PredictionParams {
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

pub async fn list_predictions(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<PredictionParams>,
) -> impl IntoResponse {
    let limit = params.limit.min(MAX_PAGE_SIZE);
    match state.storage.list_predictions(
        params.connection_id.as_deref(),
        limit,
        params.offset,
    ) {
        Ok(predictions) => success_response(StatusCode::OK, &trace_id, predictions),
        Err(e) => storage_error(&trace_id, e),
    }
}
