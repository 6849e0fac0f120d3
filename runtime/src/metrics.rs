//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for:
//! - Batch ingestion (batches and events by outcome)
//! - Broker publishing (latency, errors, connects)
//! - Retry loops
//!
//! Recording without an installed exporter is a no-op, so library code records
//! unconditionally and only the server binary decides whether to expose them.
//!
//! # Example
//!
//! ```rust,no_run
//! use status_ingest_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Start metrics server on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started: false,
        }
    }

    /// Address the exporter listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the exporter was installed by this server.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Register metric descriptions and start the HTTP exporter.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and returns `Ok(())` without installing a second one.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        // Register all metric descriptions
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            // Configure histogram buckets for latency measurements
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install() {
            Ok(()) => {
                self.started = true;
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Ingestion Metrics
    describe_counter!(
        "ingest_batches_total",
        "Total number of batch requests by outcome"
    );
    describe_counter!(
        "ingest_events_total",
        "Total number of events by outcome"
    );

    // Broker Metrics
    describe_counter!(
        "broker_messages_published_total",
        "Total number of messages accepted by the broker"
    );
    describe_counter!(
        "broker_publish_errors_total",
        "Total number of failed publish attempts"
    );
    describe_histogram!(
        "broker_publish_duration_seconds",
        "Time taken by a single publish attempt"
    );
    describe_counter!(
        "broker_connects_total",
        "Total number of broker dial attempts by outcome"
    );

    // Retry Metrics
    describe_counter!(
        "retry_attempts_total",
        "Total number of retry attempts"
    );
    describe_counter!(
        "retry_successes_total",
        "Total number of operations that succeeded after retrying"
    );
    describe_counter!(
        "retry_exhausted_total",
        "Total number of retry chains that ran out of attempts"
    );
}

/// Batch ingestion metrics recorder.
pub struct IngestMetrics;

impl IngestMetrics {
    /// Record a batch rejected before publishing (bad method, body or event).
    pub fn record_rejected() {
        counter!("ingest_batches_total", "outcome" => "rejected").increment(1);
    }

    /// Record a published batch.
    pub fn record_batch(published: usize, failed: usize) {
        let outcome = if failed == 0 { "success" } else { "partial" };
        counter!("ingest_batches_total", "outcome" => outcome).increment(1);
        counter!("ingest_events_total", "outcome" => "published").increment(published as u64);
        counter!("ingest_events_total", "outcome" => "failed").increment(failed as u64);
    }
}

/// Broker metrics recorder.
pub struct BrokerMetrics;

impl BrokerMetrics {
    /// Record a successful publish attempt.
    pub fn record_publish(duration: Duration) {
        counter!("broker_messages_published_total").increment(1);
        histogram!("broker_publish_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a failed publish attempt.
    pub fn record_publish_error() {
        counter!("broker_publish_errors_total").increment(1);
    }

    /// Record a dial attempt.
    pub fn record_connect(success: bool) {
        let outcome = if success { "success" } else { "failure" };
        counter!("broker_connects_total", "outcome" => outcome).increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(!server.is_started());
        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_recording_without_exporter_is_noop() {
        IngestMetrics::record_rejected();
        IngestMetrics::record_batch(3, 1);
        BrokerMetrics::record_publish(Duration::from_millis(5));
        BrokerMetrics::record_publish_error();
        BrokerMetrics::record_connect(false);
        RetryMetrics::record_attempt();
        RetryMetrics::record_success();
        RetryMetrics::record_exhausted();
    }
}
