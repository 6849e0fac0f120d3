//! # Status Ingest Core
//!
//! Core types and traits for the status ingestion edge.
//!
//! This crate is the functional core of the service: it knows what a status event
//! looks like, which queue it belongs to and how a batch is turned into a
//! [`batch::BatchOutcome`]. It performs no I/O of its own. Everything that talks
//! to a broker sits behind the traits in [`broker`] and [`publisher`].
//!
//! ## Modules
//!
//! - [`event`]: the wire representation of one status event and its validation
//! - [`routing`]: the exchange/queue [`routing::Topology`] and queue selection
//! - [`broker`]: the seam between the resilient publisher and a concrete AMQP client
//! - [`publisher`]: the [`publisher::EventPublisher`] trait used by HTTP handlers
//! - [`batch`]: batch validation and per-event publishing with failure isolation
//!
//! ## Example
//!
//! ```
//! use status_ingest_core::event::StatusEvent;
//! use status_ingest_core::routing::Topology;
//!
//! let topology = Topology::for_instance("rust-axum").unwrap();
//! let event: StatusEvent = serde_json::from_str(
//!     r#"{"state":"DELIVERED","updatedAt":"2025-01-01T00:00:00Z","txId":"tx-1",
//!        "trackData":{"is_system":true}}"#,
//! ).unwrap();
//!
//! assert!(event.validate().is_ok());
//! assert_eq!(topology.route_queue(event.is_system_event()), "system-rust-axum");
//! ```

pub mod batch;
pub mod broker;
pub mod event;
pub mod publisher;
pub mod routing;

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned by the object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export the types handlers and binaries reach for most often
pub use batch::{BatchOutcome, EventFailure};
pub use event::{StatusEvent, ValidationError};
pub use publisher::{EventPublisher, PublishError};
pub use routing::Topology;
