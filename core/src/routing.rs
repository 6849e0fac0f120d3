//! Broker topology and queue routing.
//!
//! Each deployment binds to exactly one direct exchange and a fixed pair of
//! durable queues, one for regular events and one for system events. Each queue
//! is bound to the exchange with its own name as the routing key, so selecting a
//! queue name is the same as selecting a routing key.

use thiserror::Error;

/// Invalid topology configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// A required name is empty.
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    /// Regular and system events would land on the same queue.
    #[error("regular and system queues must differ (both are '{0}')")]
    SameQueue(String),
}

/// Exchange and queue names for one deployment instance.
///
/// Resolved once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    exchange: String,
    regular_queue: String,
    system_queue: String,
}

impl Topology {
    /// Create a topology from explicit names.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] if any name is empty or both queues share a name.
    pub fn new(
        exchange: impl Into<String>,
        regular_queue: impl Into<String>,
        system_queue: impl Into<String>,
    ) -> Result<Self, TopologyError> {
        let exchange = exchange.into();
        let regular_queue = regular_queue.into();
        let system_queue = system_queue.into();

        if exchange.is_empty() {
            return Err(TopologyError::EmptyName("exchange"));
        }
        if regular_queue.is_empty() {
            return Err(TopologyError::EmptyName("regular queue"));
        }
        if system_queue.is_empty() {
            return Err(TopologyError::EmptyName("system queue"));
        }
        if regular_queue == system_queue {
            return Err(TopologyError::SameQueue(regular_queue));
        }

        Ok(Self {
            exchange,
            regular_queue,
            system_queue,
        })
    }

    /// Conventional layout for an instance: exchange and regular queue are named
    /// after the instance, the system queue gets a `system-` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::EmptyName`] if `instance` is empty.
    pub fn for_instance(instance: &str) -> Result<Self, TopologyError> {
        if instance.is_empty() {
            return Err(TopologyError::EmptyName("instance"));
        }
        Self::new(instance, instance, format!("system-{instance}"))
    }

    /// Queue (and routing key) for an event.
    #[must_use]
    pub fn route_queue(&self, is_system: bool) -> &str {
        if is_system {
            &self.system_queue
        } else {
            &self.regular_queue
        }
    }

    /// The direct exchange every message is published to.
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Both queues, regular first.
    #[must_use]
    pub fn queues(&self) -> [&str; 2] {
        [&self.regular_queue, &self.system_queue]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_for_instance_layout() {
        let topology = Topology::for_instance("golang-echo-nginx").unwrap();
        assert_eq!(topology.exchange(), "golang-echo-nginx");
        assert_eq!(topology.route_queue(false), "golang-echo-nginx");
        assert_eq!(topology.route_queue(true), "system-golang-echo-nginx");
        assert_eq!(
            topology.queues(),
            ["golang-echo-nginx", "system-golang-echo-nginx"]
        );
    }

    #[test]
    fn test_explicit_names() {
        let topology = Topology::new("status", "events", "system-events").unwrap();
        assert_eq!(topology.exchange(), "status");
        assert_eq!(topology.route_queue(false), "events");
        assert_eq!(topology.route_queue(true), "system-events");
    }

    #[test]
    fn test_rejects_empty_names() {
        assert_eq!(
            Topology::new("", "a", "b"),
            Err(TopologyError::EmptyName("exchange"))
        );
        assert_eq!(
            Topology::new("x", "", "b"),
            Err(TopologyError::EmptyName("regular queue"))
        );
        assert_eq!(
            Topology::new("x", "a", ""),
            Err(TopologyError::EmptyName("system queue"))
        );
        assert_eq!(
            Topology::for_instance(""),
            Err(TopologyError::EmptyName("instance"))
        );
    }

    #[test]
    fn test_rejects_shared_queue() {
        assert_eq!(
            Topology::new("x", "q", "q"),
            Err(TopologyError::SameQueue("q".to_string()))
        );
    }

    proptest! {
        #[test]
        fn prop_routing_is_distinct_and_stable(instance in "[a-z][a-z0-9-]{0,20}") {
            let topology = Topology::for_instance(&instance).unwrap();
            let regular = topology.route_queue(false).to_string();
            let system = topology.route_queue(true).to_string();

            prop_assert_ne!(&regular, &system);
            prop_assert_eq!(topology.route_queue(false), regular.as_str());
            prop_assert_eq!(topology.route_queue(true), system.as_str());
        }
    }
}
