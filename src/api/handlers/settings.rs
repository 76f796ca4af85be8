//! Runtime settings: automatic repair and periodic checks.
//!
//! Both are persisted in the preference store so they survive restarts.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::envelope::{ApiError, ApiResponse};
use crate::storage::keys;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub auto_fix: bool,
    pub periodic_checks: bool,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    pub auto_fix: Option<bool>,
    pub periodic_checks: Option<bool>,
}

fn current(state: &ApiState) -> SettingsResponse {
    SettingsResponse {
        auto_fix: state.coordinator.auto_fix_enabled(),
        periodic_checks: state
            .prefs
            .get_bool(keys::PERIODIC_CHECKS_ENABLED)
            .ok()
            .flatten()
            .unwrap_or(true),
    }
}

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(current(&state))
}

/// POST /api/v1/settings
///
/// A malformed body is answered in the error envelope rather than with
/// axum's plain-text rejection.
pub async fn update_settings(
    State(state): State<ApiState>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Response {
    let update = match payload {
        Ok(Json(update)) => update,
        Err(rejection) => return ApiError::invalid_body(rejection.body_text()).into_response(),
    };
    if let Some(enabled) = update.periodic_checks {
        if let Err(e) = state.prefs.set_bool(keys::PERIODIC_CHECKS_ENABLED, enabled) {
            tracing::error!(error = %e, "Failed to persist periodic checks setting");
            return ApiError::storage("periodic checks setting", e).into_response();
        }
        state.coordinator.activity_log().info(format!(
            "Periodic checks {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }
    if let Some(enabled) = update.auto_fix {
        state.coordinator.set_auto_fix(enabled);
    }
    ApiResponse::ok(current(&state))
}
