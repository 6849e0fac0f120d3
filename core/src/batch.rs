//! Batch validation and per-event publishing.
//!
//! Structural validation is all-or-nothing: one invalid event rejects the whole
//! batch before anything is published. Publishing is the opposite: each event is
//! attempted on its own and a failure is recorded against its `txId` without
//! stopping the rest of the batch.

use crate::event::{StatusEvent, ValidationError};
use crate::publisher::EventPublisher;
use crate::routing::Topology;
use serde::Serialize;
use thiserror::Error;

/// Message recorded when an event cannot be serialized.
pub const SERIALIZATION_FAILED: &str = "Failed to serialize event";

/// The first structurally invalid event in a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source}")]
pub struct InvalidEvent {
    /// Position of the event in the batch
    pub index: usize,
    /// What was wrong with it
    pub source: ValidationError,
}

/// One event that could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventFailure {
    /// `txId` of the failed event
    pub event: String,
    /// Why it failed
    pub error: String,
}

/// Result of publishing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of events published successfully
    pub processed: usize,
    /// Failures in input order
    pub errors: Vec<EventFailure>,
}

impl BatchOutcome {
    /// Whether every event was published.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of events attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.processed + self.errors.len()
    }
}

/// Validate every event, stopping at the first invalid one.
///
/// # Errors
///
/// Returns [`InvalidEvent`] for the first event failing [`StatusEvent::validate`].
pub fn validate_batch(events: &[StatusEvent]) -> Result<(), InvalidEvent> {
    for (index, event) in events.iter().enumerate() {
        if let Err(source) = event.validate() {
            tracing::warn!(index, error = %source, "Validation failed for event");
            return Err(InvalidEvent { index, source });
        }
    }
    Ok(())
}

/// Route, serialize and publish each event in order.
///
/// Events are published sequentially so failures are reported in input order.
/// Callers are expected to have run [`validate_batch`] first.
pub async fn publish_batch(
    publisher: &dyn EventPublisher,
    topology: &Topology,
    events: &[StatusEvent],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for event in events {
        let queue = topology.route_queue(event.is_system_event());

        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(tx_id = %event.tx_id, error = %err, "Failed to serialize event");
                outcome.errors.push(EventFailure {
                    event: event.tx_id.clone(),
                    error: SERIALIZATION_FAILED.to_string(),
                });
                continue;
            }
        };

        match publisher.publish(queue, &payload).await {
            Ok(()) => {
                tracing::debug!(tx_id = %event.tx_id, queue, "Event published");
                outcome.processed += 1;
            }
            Err(err) => {
                tracing::error!(tx_id = %event.tx_id, queue, error = %err, "Failed to publish event");
                outcome.errors.push(EventFailure {
                    event: event.tx_id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_validate_batch_reports_first_invalid() {
        let events = vec![
            StatusEvent::new("A", "t", "tx-1"),
            StatusEvent::new("A", "", "tx-2"),
            StatusEvent::new("", "t", "tx-3"),
        ];
        let err = validate_batch(&events).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.source, ValidationError::MissingField("updatedAt"));
        assert_eq!(err.to_string(), "field 'updatedAt' is required");
    }

    #[test]
    fn test_validate_batch_accepts_valid() {
        let events = vec![StatusEvent::new("A", "t", "tx-1")];
        assert!(validate_batch(&events).is_ok());
    }

    #[test]
    fn test_outcome_counts() {
        let outcome = BatchOutcome {
            processed: 2,
            errors: vec![EventFailure {
                event: "tx-2".to_string(),
                error: "boom".to_string(),
            }],
        };
        assert!(!outcome.is_complete());
        assert_eq!(outcome.attempted(), 3);
        assert!(BatchOutcome::default().is_complete());
    }
}
