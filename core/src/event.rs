//! Status event wire model and structural validation.
//!
//! A [`StatusEvent`] is one unit of work posted by upstream producers. The JSON
//! field names mirror what those producers already send, which is a mix of
//! camelCase (`updatedAt`, `txId`, `trackData`) and snake_case (`is_system`,
//! `channel_id`). The camelCase spellings of the latter two are accepted on input.
//!
//! Required string fields default to empty when absent so that a missing field
//! surfaces as a [`ValidationError`] naming it, not as an opaque parse failure.
//! Explicit `null` is treated the same as absent.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Structural validation failure for a single event.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("field '{0}' is required")]
    MissingField(&'static str),
}

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Error details attached to an event by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Producer-specific error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Tracking metadata used for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackData {
    /// Optional delivery priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// System events are routed to the system queue
    #[serde(default, alias = "isSystem", deserialize_with = "null_as_default")]
    pub is_system: bool,
}

/// One status event as received over HTTP and published to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// New state of the tracked entity
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,

    /// Optional error details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,

    /// Optional tracking metadata
    #[serde(default, rename = "trackData", skip_serializing_if = "Option::is_none")]
    pub track_data: Option<TrackData>,

    /// Opaque timestamp text, never parsed
    #[serde(default, rename = "updatedAt", deserialize_with = "null_as_default")]
    pub updated_at: String,

    /// Transaction id, used as the correlation key in error reports
    #[serde(default, rename = "txId", deserialize_with = "null_as_default")]
    pub tx_id: String,

    /// Recipient email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Delivery channel id
    #[serde(default, alias = "channelId", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    /// Delivery channel name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl StatusEvent {
    /// Create an event with only the required fields set.
    #[must_use]
    pub fn new(
        state: impl Into<String>,
        updated_at: impl Into<String>,
        tx_id: impl Into<String>,
    ) -> Self {
        Self {
            state: state.into(),
            error: None,
            track_data: None,
            updated_at: updated_at.into(),
            tx_id: tx_id.into(),
            email: None,
            channel_id: None,
            channel: None,
        }
    }

    /// Check the required fields in order `state`, `updatedAt`, `txId`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.state.is_empty() {
            return Err(ValidationError::MissingField("state"));
        }
        if self.updated_at.is_empty() {
            return Err(ValidationError::MissingField("updatedAt"));
        }
        if self.tx_id.is_empty() {
            return Err(ValidationError::MissingField("txId"));
        }
        Ok(())
    }

    /// Whether this event belongs on the system queue.
    ///
    /// Absent `trackData` means a regular event.
    #[must_use]
    pub fn is_system_event(&self) -> bool {
        self.track_data
            .as_ref()
            .is_some_and(|track| track.is_system)
    }

    /// Serialize this event to the exact JSON bytes that get published.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
