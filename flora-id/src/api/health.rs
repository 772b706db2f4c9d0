//! Health check endpoint
//!
//! Always answers once the process is up; reports the capability fixed at
//! startup (local inference availability, device, species count).

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use flora_common::api::HealthResponse;

use crate::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "flora-id".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        ml_available: state.ml_status.available,
        ml_error: state.ml_status.error.clone(),
        device: state.ml_status.device.to_string(),
        flower_count: state.pipeline.catalog().len(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
