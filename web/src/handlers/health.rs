//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check the broker.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// `ready` or `not_ready`
    pub status: &'static str,
    /// `connected` or `disconnected`
    pub broker: &'static str,
}

/// Readiness check backed by the publisher's link state.
///
/// Never dials: a disconnected publisher reports 503 until the next publish
/// restores the link.
///
/// # Status Codes
///
/// - 200 OK: the publisher holds an open broker link
/// - 503 Service Unavailable: it does not
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    if state.publisher.is_connected().await {
        (
            StatusCode::OK,
            Json(Readiness {
                status: "ready",
                broker: "connected",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Readiness {
                status: "not_ready",
                broker: "disconnected",
            }),
        )
    }
}
