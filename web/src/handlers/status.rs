//! Batch ingestion endpoint.

use crate::{AppError, AppState, WebResult};
use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{Method, StatusCode},
};
use serde::Serialize;
use status_ingest_core::batch::{self, BatchOutcome, EventFailure};
use status_ingest_core::StatusEvent;
use status_ingest_runtime::metrics::IngestMetrics;

/// Overall result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Every event was published
    Success,
    /// At least one event failed
    PartialSuccess,
}

/// Response body for an accepted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Overall result
    pub status: BatchStatus,
    /// Events published successfully
    pub processed: usize,
    /// Failed events in input order (omitted when empty)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EventFailure>,
}

impl BatchReport {
    /// HTTP status for this report: 200, or 207 when some events failed.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.status {
            BatchStatus::Success => StatusCode::OK,
            BatchStatus::PartialSuccess => StatusCode::MULTI_STATUS,
        }
    }
}

impl From<BatchOutcome> for BatchReport {
    fn from(outcome: BatchOutcome) -> Self {
        let status = if outcome.is_complete() {
            BatchStatus::Success
        } else {
            BatchStatus::PartialSuccess
        };
        Self {
            status,
            processed: outcome.processed,
            errors: outcome.errors,
        }
    }
}

/// Accept a JSON array of status events and publish each one.
///
/// # Endpoint
///
/// ```text
/// POST /status/status/
/// ```
///
/// # Responses
///
/// - 200 `{"status":"SUCCESS","processed":N}`
/// - 207 `{"status":"PARTIAL_SUCCESS","processed":N,"errors":[{"event":"<txId>","error":"..."}]}`
/// - 400 / 405 `{"error":"..."}` when the request itself is unusable; nothing is published
///
/// # Errors
///
/// Returns [`AppError`] for request-level failures only.
#[tracing::instrument(skip_all, fields(method = %method))]
pub async fn ingest_status(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> WebResult<(StatusCode, Json<BatchReport>)> {
    let events = match parse_batch(&method, body) {
        Ok(events) => events,
        Err(err) => {
            IngestMetrics::record_rejected();
            return Err(err);
        }
    };

    tracing::debug!(events = events.len(), "Batch accepted");

    let outcome = batch::publish_batch(state.publisher.as_ref(), &state.topology, &events).await;
    IngestMetrics::record_batch(outcome.processed, outcome.errors.len());

    if outcome.is_complete() {
        tracing::info!(processed = outcome.processed, "Batch published");
    } else {
        tracing::warn!(
            processed = outcome.processed,
            failed = outcome.errors.len(),
            "Batch partially published"
        );
    }

    let report = BatchReport::from(outcome);
    Ok((report.status_code(), Json(report)))
}

/// Request-level checks, in order: method, body present, JSON array, non-empty, valid.
fn parse_batch(
    method: &Method,
    body: Result<Bytes, BytesRejection>,
) -> WebResult<Vec<StatusEvent>> {
    if *method != Method::POST {
        return Err(AppError::method_not_allowed());
    }

    let body = body.map_err(|rejection| AppError::new(rejection.status(), rejection.body_text()))?;
    if body.is_empty() {
        return Err(AppError::empty_body());
    }

    // A literal `null` body reads as an empty batch.
    let events: Vec<StatusEvent> = serde_json::from_slice::<Option<Vec<StatusEvent>>>(&body)
        .map_err(|err| {
            tracing::warn!(error = %err, "Rejected malformed batch body");
            AppError::not_an_array()
        })?
        .unwrap_or_default();

    if events.is_empty() {
        return Err(AppError::empty_batch());
    }

    batch::validate_batch(&events)?;
    Ok(events)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_report_status_codes() {
        let ok = BatchReport::from(BatchOutcome {
            processed: 3,
            errors: vec![],
        });
        assert_eq!(ok.status_code(), StatusCode::OK);

        let partial = BatchReport::from(BatchOutcome {
            processed: 2,
            errors: vec![EventFailure {
                event: "tx-2".to_string(),
                error: "boom".to_string(),
            }],
        });
        assert_eq!(partial.status_code(), StatusCode::MULTI_STATUS);
    }

    #[test]
    fn test_report_serialization() {
        let report = BatchReport::from(BatchOutcome {
            processed: 1,
            errors: vec![],
        });
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"status": "SUCCESS", "processed": 1})
        );
    }

    #[test]
    fn test_non_post_rejected_before_body() {
        let err = parse_batch(&Method::GET, Ok(Bytes::new())).unwrap_err();
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_object_body_rejected() {
        let err = parse_batch(&Method::POST, Ok(Bytes::from_static(br#"{"txId":"x"}"#))).unwrap_err();
        assert_eq!(err.message(), "Request body must be a JSON array");
    }
}
