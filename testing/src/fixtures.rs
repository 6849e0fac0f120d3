//! Sample events and request bodies.

use serde_json::{Value, json};
use status_ingest_core::event::{ErrorData, TrackData};
use status_ingest_core::StatusEvent;

/// Timestamp used by every fixture.
pub const UPDATED_AT: &str = "2025-01-01T00:00:00Z";

/// A valid regular event.
#[must_use]
pub fn status_event(tx_id: &str) -> StatusEvent {
    let mut event = StatusEvent::new("DELIVERED", UPDATED_AT, tx_id);
    event.email = Some("user@example.com".to_string());
    event.channel = Some("email".to_string());
    event.track_data = Some(TrackData {
        priority: Some(1),
        is_system: false,
    });
    event
}

/// A valid event routed to the system queue.
#[must_use]
pub fn system_event(tx_id: &str) -> StatusEvent {
    let mut event = StatusEvent::new("FAILED", UPDATED_AT, tx_id);
    event.error = Some(ErrorData {
        code: Some("E42".to_string()),
        message: Some("mailbox full".to_string()),
    });
    event.track_data = Some(TrackData {
        priority: None,
        is_system: true,
    });
    event
}

/// A request body item in wire form.
#[must_use]
pub fn event_json(tx_id: &str, is_system: bool) -> Value {
    json!({
        "state": "DELIVERED",
        "updatedAt": UPDATED_AT,
        "txId": tx_id,
        "trackData": { "is_system": is_system },
    })
}

/// A JSON array body of regular events, one per `tx_id`.
#[must_use]
pub fn batch_json(tx_ids: &[&str]) -> String {
    Value::Array(tx_ids.iter().map(|id| event_json(id, false)).collect()).to_string()
}
