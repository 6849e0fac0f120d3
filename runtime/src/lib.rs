//! # Status Ingest Runtime
//!
//! Runtime support shared by the broker publisher and the HTTP shell.
//!
//! ## Components
//!
//! - **Retry**: a bounded retry loop with exponential backoff and a typed
//!   exhausted/aborted outcome, used for both broker connects and publishes
//! - **Metrics**: Prometheus exporter setup and the recorders used across crates
//!
//! ## Example
//!
//! ```rust
//! use status_ingest_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::exponential(5, Duration::from_secs(1));
//!
//! let value = retry_with_backoff(&policy, || async { Ok::<_, String>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

/// Bounded retry with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

pub use retry::{RetryError, RetryPolicy, retry_with_backoff, retry_with_predicate};
