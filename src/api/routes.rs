//! API route definitions
//!
//! - /api/v1/status   - published engine status
//! - /api/v1/log      - activity log
//! - /api/v1/check    - manual check
//! - /api/v1/settings - auto-fix and periodic-check toggles
//! - /health          - liveness

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ApiState};

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/log", get(handlers::get_log))
        .route("/check", post(handlers::run_check))
        .route(
            "/settings",
            get(handlers::get_settings).post(handlers::update_settings),
        )
        .with_state(state)
}

pub fn health_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
