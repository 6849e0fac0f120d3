//! Publisher abstraction used by request handlers.
//!
//! Handlers only need "put these bytes on that queue" plus a readiness probe, so
//! they depend on [`EventPublisher`] rather than on the resilient AMQP
//! implementation. This keeps the batch logic testable with an in-memory double.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`: one publisher is shared by every
//! in-flight request through an `Arc`.

use crate::BoxFuture;
use crate::broker::BrokerError;
use thiserror::Error;

/// Errors returned by [`EventPublisher`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The broker stayed unreachable for every connect attempt.
    #[error("failed to connect to broker after {attempts} attempts: {last_error}")]
    ConnectionExhausted {
        /// Connect attempts made
        attempts: usize,
        /// Error from the final attempt
        last_error: BrokerError,
    },

    /// Every publish attempt failed.
    #[error("failed to publish message after {attempts} attempts: {last_error}")]
    PublishExhausted {
        /// Publish attempts made
        attempts: usize,
        /// Error from the final attempt
        last_error: BrokerError,
    },

    /// The payload could not be compressed.
    #[error("failed to compress message: {0}")]
    Compression(String),

    /// Exchange or queue declaration failed.
    #[error("failed to declare topology: {0}")]
    Topology(BrokerError),

    /// The publisher has been shut down.
    #[error("publisher is closed")]
    Closed,
}

/// Publishes already-serialized event payloads to named queues.
///
/// # Examples
///
/// ```rust,ignore
/// let payload = event.to_json()?;
/// let queue = topology.route_queue(event.is_system_event());
/// publisher.publish(queue, &payload).await?;
/// ```
pub trait EventPublisher: Send + Sync {
    /// Deliver `payload` to `queue`, retrying transient failures internally.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] once the implementation gives up on this payload.
    fn publish<'a>(
        &'a self,
        queue: &'a str,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), PublishError>>;

    /// Whether a live broker link is currently held. Never dials.
    fn is_connected(&self) -> BoxFuture<'_, bool>;

    /// Release broker resources. Safe to call more than once.
    fn close(&self) -> BoxFuture<'_, ()>;
}
