//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub scheduler_running: bool,
    pub active_timers: usize,
    pub alert_active: bool,
    pub version: String,
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let runtime = state.runtime();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        scheduler_running: runtime.is_running(),
        active_timers: runtime.scheduler().timer_count(),
        alert_active: runtime.current_alert().is_some(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
