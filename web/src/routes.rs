//! Router assembly.

use crate::AppState;
use crate::handlers::{health_check, ingest_status, readiness_check};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, get},
};
use tower_http::trace::TraceLayer;

/// Batch ingestion path.
pub const STATUS_PATH: &str = "/status/status/";

/// Build the application router.
///
/// The ingestion route accepts every method so that non-`POST` requests get the
/// JSON 405 body instead of Axum's empty default.
///
/// # Example
///
/// ```ignore
/// let app = build_router(state, 2 * 1024 * 1024);
/// axum::serve(listener, app).await?;
/// ```
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(STATUS_PATH, any(ingest_status))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
