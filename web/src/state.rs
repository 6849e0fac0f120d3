//! Application state for Axum handlers.

use status_ingest_core::{EventPublisher, Topology};
use std::sync::Arc;

/// State shared across all HTTP handlers.
///
/// Cheap to clone: the publisher and topology are behind `Arc`s and shared by
/// every in-flight request.
///
/// # Examples
///
/// ```ignore
/// use status_ingest_web::AppState;
/// use std::sync::Arc;
///
/// let state = AppState::new(Arc::new(publisher), topology);
/// let app = status_ingest_web::build_router(state, 2 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Publisher used for every event
    pub publisher: Arc<dyn EventPublisher>,
    /// Exchange/queue layout used for routing
    pub topology: Arc<Topology>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(publisher: Arc<dyn EventPublisher>, topology: Topology) -> Self {
        Self {
            publisher,
            topology: Arc::new(topology),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }
}
