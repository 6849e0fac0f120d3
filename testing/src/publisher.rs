//! Recording [`EventPublisher`] for handler and batch tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use status_ingest_core::broker::BrokerError;
use status_ingest_core::{BoxFuture, EventPublisher, PublishError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type FailFn = Box<dyn Fn(&str, &[u8]) -> bool + Send + Sync>;

/// One payload handed to [`RecordingPublisher::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPublish {
    /// Destination queue
    pub queue: String,
    /// Uncompressed payload
    pub payload: Vec<u8>,
}

impl RecordedPublish {
    /// Payload parsed as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap()
    }
}

#[derive(Default)]
struct Inner {
    published: Mutex<Vec<RecordedPublish>>,
    fail: Mutex<Option<FailFn>>,
    disconnected: AtomicBool,
    close_calls: AtomicUsize,
}

/// An [`EventPublisher`] that stores successful publishes in memory.
///
/// Failing publishes return [`PublishError::PublishExhausted`], which is what
/// handlers see when the real publisher gives up.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    inner: Arc<Inner>,
}

impl RecordingPublisher {
    /// Create a connected publisher that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every publish for which `predicate(queue, payload)` is true.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&str, &[u8]) -> bool + Send + Sync + 'static,
    {
        *self.inner.fail.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Fail every event whose `txId` equals `tx_id`.
    pub fn fail_tx_id(&self, tx_id: &str) {
        let tx_id = tx_id.to_string();
        self.fail_when(move |_, payload| {
            serde_json::from_slice::<serde_json::Value>(payload)
                .ok()
                .and_then(|value| value.get("txId").and_then(|v| v.as_str().map(str::to_string)))
                .is_some_and(|id| id == tx_id)
        });
    }

    /// Change what [`EventPublisher::is_connected`] reports.
    pub fn set_connected(&self, connected: bool) {
        self.inner.disconnected.store(!connected, Ordering::SeqCst);
    }

    /// Successful publishes, in order.
    #[must_use]
    pub fn published(&self) -> Vec<RecordedPublish> {
        self.inner.published.lock().unwrap().clone()
    }

    /// Number of [`EventPublisher::close`] calls.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish<'a>(
        &'a self,
        queue: &'a str,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        Box::pin(async move {
            let fail = self
                .inner
                .fail
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|fail| fail(queue, payload));
            if fail {
                return Err(PublishError::PublishExhausted {
                    attempts: 5,
                    last_error: BrokerError::Publish("connection reset by peer".to_string()),
                });
            }

            self.inner.published.lock().unwrap().push(RecordedPublish {
                queue: queue.to_string(),
                payload: payload.to_vec(),
            });
            Ok(())
        })
    }

    fn is_connected(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { !self.inner.disconnected.load(Ordering::SeqCst) })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fail_tx_id() {
        let publisher = RecordingPublisher::new();
        publisher.fail_tx_id("tx-2");

        assert!(publisher.publish("q", br#"{"txId":"tx-1"}"#).await.is_ok());
        assert!(publisher.publish("q", br#"{"txId":"tx-2"}"#).await.is_err());

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].json()["txId"], "tx-1");
    }

    #[tokio::test]
    async fn test_connected_flag() {
        let publisher = RecordingPublisher::new();
        assert!(publisher.is_connected().await);
        publisher.set_connected(false);
        assert!(!publisher.is_connected().await);
    }
}
