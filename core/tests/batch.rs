//! Batch publishing against an in-memory publisher.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use status_ingest_core::batch::{publish_batch, validate_batch};
use status_ingest_core::{StatusEvent, Topology};
use status_ingest_testing::{RecordingPublisher, fixtures};

fn topology() -> Topology {
    Topology::for_instance("rust-axum").unwrap()
}

#[tokio::test]
async fn test_all_events_published() {
    let publisher = RecordingPublisher::new();
    let events = vec![fixtures::status_event("tx-1"), fixtures::status_event("tx-2")];

    let outcome = publish_batch(&publisher, &topology(), &events).await;

    assert_eq!(outcome.processed, 2);
    assert!(outcome.is_complete());
    assert_eq!(publisher.published().len(), 2);
}

#[tokio::test]
async fn test_failure_is_isolated_to_its_event() {
    let publisher = RecordingPublisher::new();
    publisher.fail_tx_id("tx-2");
    let events = vec![
        fixtures::status_event("tx-1"),
        fixtures::status_event("tx-2"),
        fixtures::status_event("tx-3"),
    ];

    let outcome = publish_batch(&publisher, &topology(), &events).await;

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].event, "tx-2");
    assert!(outcome.errors[0].error.starts_with("failed to publish message after 5 attempts"));

    let published: Vec<_> = publisher
        .published()
        .iter()
        .map(|p| p.json()["txId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(published, vec!["tx-1", "tx-3"]);
}

#[tokio::test]
async fn test_events_routed_by_system_flag() {
    let publisher = RecordingPublisher::new();
    let events = vec![
        fixtures::status_event("tx-1"),
        fixtures::system_event("tx-2"),
        StatusEvent::new("SENT", fixtures::UPDATED_AT, "tx-3"),
    ];

    publish_batch(&publisher, &topology(), &events).await;

    let queues: Vec<_> = publisher.published().into_iter().map(|p| p.queue).collect();
    assert_eq!(queues, vec!["rust-axum", "system-rust-axum", "rust-axum"]);
}

#[tokio::test]
async fn test_published_payload_is_event_json() {
    let publisher = RecordingPublisher::new();
    let event = fixtures::system_event("tx-9");

    publish_batch(&publisher, &topology(), std::slice::from_ref(&event)).await;

    let recorded = publisher.published();
    let decoded: StatusEvent = serde_json::from_slice(&recorded[0].payload).unwrap();
    assert_eq!(decoded, event);
    assert_eq!(recorded[0].json()["trackData"]["is_system"], true);
}

#[tokio::test]
async fn test_every_event_failing() {
    let publisher = RecordingPublisher::new();
    publisher.fail_when(|_, _| true);
    let events = vec![fixtures::status_event("a"), fixtures::status_event("b")];

    let outcome = publish_batch(&publisher, &topology(), &events).await;

    assert_eq!(outcome.processed, 0);
    let failed: Vec<_> = outcome.errors.iter().map(|f| f.event.as_str()).collect();
    assert_eq!(failed, vec!["a", "b"]);
}

#[test]
fn test_fixtures_are_valid() {
    let events = vec![fixtures::status_event("tx-1"), fixtures::system_event("tx-2")];
    assert!(validate_batch(&events).is_ok());
}
