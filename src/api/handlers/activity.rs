//! Activity log endpoint.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::api::envelope::{ApiError, ApiResponse};
use crate::config::defaults::API_LOG_DEFAULT_LIMIT;
use crate::pipeline::LogEntry;

#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogLine {
    #[serde(flatten)]
    pub entry: LogEntry,
    /// `[YYYY-MM-DD HH:MM:SS] LEVEL message` in local time
    pub line: String,
}

/// GET /api/v1/log?limit=N - most recent entries, oldest first
pub async fn get_log(State(state): State<ApiState>, Query(params): Query<LogParams>) -> Response {
    let limit = params.limit.unwrap_or(API_LOG_DEFAULT_LIMIT);
    if limit == 0 {
        return ApiError::invalid_query("limit must be > 0").into_response();
    }
    let lines: Vec<LogLine> = state
        .coordinator
        .activity_log()
        .recent(limit)
        .into_iter()
        .map(|entry| LogLine {
            line: entry.to_string(),
            entry,
        })
        .collect();
    ApiResponse::ok(lines)
}
