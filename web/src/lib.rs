//! Axum HTTP surface for the status ingestion edge.
//!
//! This crate is the imperative shell around `status-ingest-core`: it turns an
//! HTTP request into a batch of events, hands them to the functional core and
//! maps the outcome back to a response.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at [`handlers::ingest_status`]
//! 2. **Request checks**: method, body, JSON array, non-empty, every event valid
//! 3. **Publish** each event through the shared [`EventPublisher`](status_ingest_core::EventPublisher)
//! 4. **Map result** to 200 (all published) or 207 (some failed)
//!
//! Request-level failures never reach the publisher and are answered by
//! [`AppError`] as `{"error": "..."}`.
//!
//! # Example
//!
//! ```ignore
//! use status_ingest_web::{AppState, build_router};
//! use std::sync::Arc;
//!
//! let state = AppState::new(Arc::new(publisher), topology);
//! let app = build_router(state, 2 * 1024 * 1024);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use routes::{STATUS_PATH, build_router};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
