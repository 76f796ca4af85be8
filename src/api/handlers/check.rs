//! Manual check endpoint.

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::info;

use super::ApiState;
use crate::api::envelope::ApiResponse;
use crate::pipeline::Trigger;

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    /// Allow an automatic repair (still subject to the auto-fix setting)
    pub fix: Option<bool>,
}

/// POST /api/v1/check?fix=true|false - run a check now and return its outcome
///
/// Holds the request open for the whole check, including any repair. A
/// client that hangs up does not stop a repair that has already started.
pub async fn run_check(State(state): State<ApiState>, Query(params): Query<CheckParams>) -> Response {
    let fix = params.fix.unwrap_or(true);
    info!(fix, "Manual check requested");
    let outcome = state.coordinator.check(Trigger::Manual, fix).await;
    ApiResponse::ok(outcome)
}
