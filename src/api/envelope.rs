//! JSON envelope for `/api/v1`.
//!
//! ```text
//! success: { "data": <payload>, "meta": { "generated_at", "version" } }
//! failure: { "error": { "code", "message" }, "meta": { ... } }
//! ```
//!
//! `meta.version` is the daemon's crate version so a status client can tell
//! which engine answered. Error codes are a closed set; each one fixes the
//! HTTP status it is sent with.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
}

impl Meta {
    fn now() -> Self {
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// `{ "data": T, "meta": ... }` with 200 OK.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: Meta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self {
            data,
            meta: Meta::now(),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Query string out of range (e.g. `limit=0`)
    InvalidQuery,
    /// Request body missing, not JSON, or the wrong shape
    InvalidBody,
    /// Preference store refused a write
    StorageFailure,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidQuery | ErrorCode::InvalidBody => StatusCode::BAD_REQUEST,
            ErrorCode::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

/// Handler error rendered as `{ "error": ..., "meta": ... }`.
#[derive(Debug)]
pub struct ApiError {
    detail: ErrorDetail,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            detail: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidQuery, message)
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidBody, message)
    }

    pub fn storage(what: &str, err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::StorageFailure, format!("failed to save {what}: {err}"))
    }

    pub fn code(&self) -> ErrorCode {
        self.detail.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: ErrorDetail,
            meta: Meta,
        }
        let status = self.detail.code.status();
        let body = Body {
            error: self.detail,
            meta: Meta::now(),
        };
        (status, axum::Json(body)).into_response()
    }
}
