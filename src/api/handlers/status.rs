//! Status endpoints: published engine status and liveness.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::ApiState;
use crate::api::envelope::ApiResponse;
use crate::pipeline::EngineStatus;

// ============================================================================
// Status Endpoint
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: EngineStatus,
    /// Human-readable verdict line, e.g. `ERROR: stale prefix`
    pub summary: String,
    pub auto_fix_enabled: bool,
}

/// GET /api/v1/status - latest published status
pub async fn get_status(State(state): State<ApiState>) -> Response {
    let status = state.coordinator.status();
    ApiResponse::ok(StatusResponse {
        summary: status.verdict.to_string(),
        status,
        auto_fix_enabled: state.coordinator.auto_fix_enabled(),
    })
}

// ============================================================================
// Liveness
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// GET /health - process liveness, independent of the IPv6 verdict
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_secs(),
    })
}
