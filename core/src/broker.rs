//! Broker client seam.
//!
//! The resilient publisher does not talk to an AMQP library directly. It dials
//! through a [`BrokerConnector`] and drives the resulting [`BrokerLink`], which
//! bundles one connection with the channel opened on it. The production
//! implementation lives in `status-ingest-amqp`; tests use the scriptable mock in
//! `status-ingest-testing`.
//!
//! # Link lifecycle
//!
//! ```text
//! connect() ──► BrokerLink ──► declare_* / publish ... ──► close_channel()
//!                   │                                      close_connection()
//!                   └── is_open() == false ──► discarded, next caller redials
//! ```

use crate::BoxFuture;
use std::time::Duration;
use thiserror::Error;

/// MIME type of every published body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// AMQP delivery mode for messages the broker must persist.
pub const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Errors reported by a broker client.
///
/// Variants carry rendered messages so the error is cheap to clone and can be
/// kept as the `last_error` of an exhausted retry chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Dialing the broker failed
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    /// The connection came up but no channel could be opened on it
    #[error("failed to open channel: {0}")]
    Channel(String),

    /// Declaring or binding an exchange/queue failed
    #[error("failed to declare {kind} '{name}': {reason}")]
    Declare {
        /// What was being declared (exchange, queue, binding)
        kind: &'static str,
        /// Name of the entity
        name: String,
        /// The reason for failure
        reason: String,
    },

    /// The broker rejected or dropped a publish
    #[error("failed to publish message: {0}")]
    Publish(String),

    /// The broker negatively acknowledged a publish
    #[error("broker rejected message on '{routing_key}'")]
    Nacked {
        /// Routing key of the rejected message
        routing_key: String,
    },

    /// A publish did not complete within its deadline
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// No open link was available when one was needed
    #[error("not connected to broker")]
    NotConnected,

    /// The publisher has been shut down
    #[error("publisher is closed")]
    Closed,

    /// Closing the channel or connection failed
    #[error("failed to close {what}: {reason}")]
    Close {
        /// Channel or connection
        what: &'static str,
        /// The reason for failure
        reason: String,
    },
}

impl BrokerError {
    /// Whether another attempt could succeed.
    ///
    /// Everything except [`BrokerError::Closed`] is treated as transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// A fully prepared message, ready to hand to a [`BrokerLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Exchange to publish to
    pub exchange: String,
    /// Routing key (the destination queue name for a direct exchange)
    pub routing_key: String,
    /// Encoded body
    pub body: Vec<u8>,
    /// `content-type` property
    pub content_type: &'static str,
    /// `content-encoding` property, if the body is compressed
    pub content_encoding: Option<&'static str>,
    /// AMQP delivery mode (2 = persistent)
    pub delivery_mode: u8,
}

impl OutboundMessage {
    /// Persistent JSON message whose body was compressed with `encoding`.
    #[must_use]
    pub fn persistent_json(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        body: Vec<u8>,
        encoding: &'static str,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body,
            content_type: CONTENT_TYPE_JSON,
            content_encoding: Some(encoding),
            delivery_mode: DELIVERY_MODE_PERSISTENT,
        }
    }

    /// Whether the broker is asked to persist this message.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.delivery_mode == DELIVERY_MODE_PERSISTENT
    }
}

/// Dials new links to a single broker endpoint.
pub trait BrokerConnector: Send + Sync + 'static {
    /// The link type produced by this connector.
    type Link: BrokerLink;

    /// Open a connection and a channel on it.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Connect`] or [`BrokerError::Channel`].
    fn connect(&self) -> BoxFuture<'_, Result<Self::Link, BrokerError>>;
}

/// One open connection plus its channel.
///
/// All declarations are idempotent on the broker side and use durable,
/// non-exclusive, non-auto-delete settings.
pub trait BrokerLink: Send + Sync + 'static {
    /// Whether both the connection and the channel are still open.
    fn is_open(&self) -> bool;

    /// Declare a durable direct exchange.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Declare`] if the broker refuses the declaration.
    fn declare_exchange<'a>(&'a self, exchange: &'a str) -> BoxFuture<'a, Result<(), BrokerError>>;

    /// Declare a durable queue.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Declare`] if the broker refuses the declaration.
    fn declare_queue<'a>(&'a self, queue: &'a str) -> BoxFuture<'a, Result<(), BrokerError>>;

    /// Bind `queue` to `exchange` with `routing_key`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Declare`] if the binding fails.
    fn bind_queue<'a>(
        &'a self,
        queue: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
    ) -> BoxFuture<'a, Result<(), BrokerError>>;

    /// Publish one message and wait for the broker to accept it.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Publish`] or [`BrokerError::Nacked`].
    fn publish<'a>(&'a self, message: &'a OutboundMessage) -> BoxFuture<'a, Result<(), BrokerError>>;

    /// Close the channel.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Close`] if the broker reports a failure.
    fn close_channel(&self) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Close`] if the broker reports a failure.
    fn close_connection(&self) -> BoxFuture<'_, Result<(), BrokerError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistent_json_message() {
        let message = OutboundMessage::persistent_json("ex", "q", vec![1, 2], "gzip");
        assert_eq!(message.content_type, "application/json");
        assert_eq!(message.content_encoding, Some("gzip"));
        assert!(message.is_persistent());
    }

    #[test]
    fn test_only_closed_is_permanent() {
        assert!(BrokerError::Connect("refused".to_string()).is_transient());
        assert!(BrokerError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(BrokerError::NotConnected.is_transient());
        assert!(!BrokerError::Closed.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = BrokerError::Declare {
            kind: "queue",
            name: "events".to_string(),
            reason: "PRECONDITION_FAILED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to declare queue 'events': PRECONDITION_FAILED"
        );
    }
}
