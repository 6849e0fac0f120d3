//! Scriptable in-memory broker.
//!
//! [`MockBroker`] is a cheap-to-clone handle: give one clone to the publisher
//! under test as its connector and keep another to script failures and inspect
//! what reached the "broker".
//!
//! Scripting knobs:
//! - refuse dials ([`MockBroker::fail_next_connects`], [`MockBroker::set_reachable`])
//! - drop every open link ([`MockBroker::disconnect`])
//! - fail or hang publishes ([`MockBroker::fail_next_publishes`],
//!   [`MockBroker::reject_when`], [`MockBroker::hang_publishes`])
//! - fail declarations and closes

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use status_ingest_core::BoxFuture;
use status_ingest_core::broker::{BrokerConnector, BrokerError, BrokerLink, OutboundMessage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type RejectFn = Box<dyn Fn(&OutboundMessage) -> bool + Send + Sync>;

/// A topology operation observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `exchange.declare`
    Exchange(String),
    /// `queue.declare`
    Queue(String),
    /// `queue.bind`
    Binding {
        /// Bound queue
        queue: String,
        /// Source exchange
        exchange: String,
        /// Binding key
        routing_key: String,
    },
}

struct BrokerState {
    reachable: AtomicBool,
    connect_failures: AtomicUsize,
    connect_attempts: AtomicUsize,
    dial_delay: Mutex<Option<Duration>>,
    publish_failures: AtomicUsize,
    publish_attempts: AtomicUsize,
    hang_publishes: AtomicBool,
    reject: Mutex<Option<RejectFn>>,
    fail_declarations: AtomicBool,
    fail_close: AtomicBool,
    channel_closes: AtomicUsize,
    connection_closes: AtomicUsize,
    published: Mutex<Vec<OutboundMessage>>,
    declarations: Mutex<Vec<Declaration>>,
    links: Mutex<Vec<Arc<AtomicBool>>>,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            connect_failures: AtomicUsize::new(0),
            connect_attempts: AtomicUsize::new(0),
            dial_delay: Mutex::new(None),
            publish_failures: AtomicUsize::new(0),
            publish_attempts: AtomicUsize::new(0),
            hang_publishes: AtomicBool::new(false),
            reject: Mutex::new(None),
            fail_declarations: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            channel_closes: AtomicUsize::new(0),
            connection_closes: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            declarations: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
        }
    }
}

/// Decrement `counter` if it is positive. Returns whether it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// In-memory broker and [`BrokerConnector`] for tests.
#[derive(Clone, Default)]
pub struct MockBroker {
    state: Arc<BrokerState>,
}

impl MockBroker {
    /// Create a reachable broker with no scripted failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` dials, then accept again.
    pub fn fail_next_connects(&self, count: usize) {
        self.state.connect_failures.store(count, Ordering::SeqCst);
    }

    /// Accept or refuse every dial until changed.
    pub fn set_reachable(&self, reachable: bool) {
        self.state.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make every dial take `delay` before completing.
    pub fn set_dial_delay(&self, delay: Duration) {
        *self.state.dial_delay.lock().unwrap() = Some(delay);
    }

    /// Close every link dialed so far, as if the broker dropped its connections.
    pub fn disconnect(&self) {
        for open in self.state.links.lock().unwrap().iter() {
            open.store(false, Ordering::SeqCst);
        }
    }

    /// Fail the next `count` publishes.
    pub fn fail_next_publishes(&self, count: usize) {
        self.state.publish_failures.store(count, Ordering::SeqCst);
    }

    /// Reject every message matching `predicate`, on every attempt.
    pub fn reject_when<F>(&self, predicate: F)
    where
        F: Fn(&OutboundMessage) -> bool + Send + Sync + 'static,
    {
        *self.state.reject.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Make publishes never complete.
    pub fn hang_publishes(&self, hang: bool) {
        self.state.hang_publishes.store(hang, Ordering::SeqCst);
    }

    /// Fail every exchange/queue declaration and binding.
    pub fn fail_declarations(&self, fail: bool) {
        self.state.fail_declarations.store(fail, Ordering::SeqCst);
    }

    /// Fail every channel and connection close.
    pub fn fail_close(&self, fail: bool) {
        self.state.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Number of dials attempted, successful or not.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of links handed out.
    #[must_use]
    pub fn links_opened(&self) -> usize {
        self.state.links.lock().unwrap().len()
    }

    /// Number of publish calls, successful or not.
    #[must_use]
    pub fn publish_attempts(&self) -> usize {
        self.state.publish_attempts.load(Ordering::SeqCst)
    }

    /// Messages the broker accepted, in order.
    #[must_use]
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.state.published.lock().unwrap().clone()
    }

    /// Topology operations the broker accepted, in order.
    #[must_use]
    pub fn declarations(&self) -> Vec<Declaration> {
        self.state.declarations.lock().unwrap().clone()
    }

    /// Number of `close_channel` calls.
    #[must_use]
    pub fn channel_closes(&self) -> usize {
        self.state.channel_closes.load(Ordering::SeqCst)
    }

    /// Number of `close_connection` calls.
    #[must_use]
    pub fn connection_closes(&self) -> usize {
        self.state.connection_closes.load(Ordering::SeqCst)
    }
}

impl BrokerConnector for MockBroker {
    type Link = MockLink;

    fn connect(&self) -> BoxFuture<'_, Result<MockLink, BrokerError>> {
        Box::pin(async move {
            self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);

            let delay = *self.state.dial_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if !self.state.reachable.load(Ordering::SeqCst)
                || take_one(&self.state.connect_failures)
            {
                return Err(BrokerError::Connect("connection refused".to_string()));
            }

            let open = Arc::new(AtomicBool::new(true));
            self.state.links.lock().unwrap().push(Arc::clone(&open));

            Ok(MockLink {
                state: Arc::clone(&self.state),
                open,
            })
        })
    }
}

/// Link handed out by [`MockBroker`].
pub struct MockLink {
    state: Arc<BrokerState>,
    open: Arc<AtomicBool>,
}

impl MockLink {
    fn declare(&self, declaration: Declaration) -> Result<(), BrokerError> {
        if self.state.fail_declarations.load(Ordering::SeqCst) {
            let (kind, name) = match &declaration {
                Declaration::Exchange(name) => ("exchange", name.clone()),
                Declaration::Queue(name) => ("queue", name.clone()),
                Declaration::Binding { queue, .. } => ("binding", queue.clone()),
            };
            return Err(BrokerError::Declare {
                kind,
                name,
                reason: "ACCESS_REFUSED".to_string(),
            });
        }
        self.state.declarations.lock().unwrap().push(declaration);
        Ok(())
    }

    fn close(&self, what: &'static str) -> Result<(), BrokerError> {
        self.open.store(false, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(BrokerError::Close {
                what,
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

impl BrokerLink for MockLink {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn declare_exchange<'a>(&'a self, exchange: &'a str) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move { self.declare(Declaration::Exchange(exchange.to_string())) })
    }

    fn declare_queue<'a>(&'a self, queue: &'a str) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move { self.declare(Declaration::Queue(queue.to_string())) })
    }

    fn bind_queue<'a>(
        &'a self,
        queue: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
    ) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move {
            self.declare(Declaration::Binding {
                queue: queue.to_string(),
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
            })
        })
    }

    fn publish<'a>(&'a self, message: &'a OutboundMessage) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move {
            self.state.publish_attempts.fetch_add(1, Ordering::SeqCst);

            if self.state.hang_publishes.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }

            if !self.is_open() {
                return Err(BrokerError::Publish("channel closed".to_string()));
            }

            if take_one(&self.state.publish_failures) {
                return Err(BrokerError::Publish("connection reset by peer".to_string()));
            }

            let rejected = self
                .state
                .reject
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|reject| reject(message));
            if rejected {
                return Err(BrokerError::Nacked {
                    routing_key: message.routing_key.clone(),
                });
            }

            self.state.published.lock().unwrap().push(message.clone());
            Ok(())
        })
    }

    fn close_channel(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            self.state.channel_closes.fetch_add(1, Ordering::SeqCst);
            self.close("channel")
        })
    }

    fn close_connection(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            self.state.connection_closes.fetch_add(1, Ordering::SeqCst);
            self.close("connection")
        })
    }
}
