use crate::state::AppState;
use crate::{api, logging};
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};

pub fn build_http_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(api::healthz))
        .route("/v1/scheduler/run", post(api::run_scheduler))
        .route(
            "/v1/connections",
            get(api::list_connections).post(api::create_connection),
        )
        .route(
            "/v1/connections/{id}/status",
            put(api::update_connection_status),
        )
        .route("/v1/alerts/active", get(api::active_alerts))
        .route("/v1/predictions", get(api::list_predictions))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
