//! # Status Ingest Testing
//!
//! Testing utilities for the status ingestion edge.
//!
//! This crate provides:
//! - [`MockBroker`]: a scriptable [`BrokerConnector`](status_ingest_core::broker::BrokerConnector)
//!   for exercising the resilient publisher without a real broker
//! - [`RecordingPublisher`]: an [`EventPublisher`](status_ingest_core::EventPublisher)
//!   that records payloads and fails on demand, for handler tests
//! - [`fixtures`]: sample events and request bodies
//!
//! ## Example
//!
//! ```
//! use status_ingest_testing::{MockBroker, fixtures};
//!
//! let broker = MockBroker::new();
//! broker.fail_next_connects(2); // first two dials are refused
//!
//! let event = fixtures::status_event("tx-1");
//! assert!(event.validate().is_ok());
//! ```

pub mod broker;
pub mod fixtures;
pub mod publisher;

// Re-export commonly used items
pub use broker::{Declaration, MockBroker, MockLink};
pub use publisher::{RecordedPublish, RecordingPublisher};
