//! Error types for web handlers.
//!
//! This module defines the request-level error that bridges between domain
//! errors and HTTP responses, implementing Axum's `IntoResponse` trait. Every
//! error renders as `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use status_ingest_core::batch::InvalidEvent;
use std::fmt;

/// Application error type for web handlers.
///
/// Request-level failures only: a batch that reaches the publisher is answered
/// with a batch report, even when every event failed.
///
/// # Examples
///
/// ```ignore
/// async fn handler(method: Method) -> Result<Json<Report>, AppError> {
///     if method != Method::POST {
///         return Err(AppError::method_not_allowed());
///     }
///     Ok(Json(report))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self { status, message }
    }

    /// HTTP status this error renders with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// Create the 405 returned for anything but `POST`.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    }

    /// Empty request body.
    #[must_use]
    pub fn empty_body() -> Self {
        Self::bad_request("Request body is required")
    }

    /// Body is not a JSON array of events.
    #[must_use]
    pub fn not_an_array() -> Self {
        Self::bad_request("Request body must be a JSON array")
    }

    /// Body is an empty JSON array.
    #[must_use]
    pub fn empty_batch() -> Self {
        Self::bad_request("Request body must contain at least one event")
    }
}

impl From<InvalidEvent> for AppError {
    fn from(err: InvalidEvent) -> Self {
        Self::bad_request(format!("Validation failed: {err}"))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Human-readable error message.
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, message = %self.message, "Request rejected");

        let body = ErrorResponse {
            error: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}
