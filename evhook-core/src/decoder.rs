//! Classification of verified request bodies.
//!
//! [`decode`] turns a raw body into a [`DecodedRequest`]:
//!
//! - `{"type":1}` is a handshake.
//! - `{"type":0,"event":{...},"ts":...}` is an event. The data block is
//!   decoded against the event catalog and the occurrence time is taken
//!   from `ts` (epoch seconds), falling back to `event.timestamp`.
//!
//! Events with an empty data block and events of unknown kinds are
//! distinct, non-error outcomes.

use evhook_sdk::objects::{Event, EventKind, RequestType, WebhookEnvelope};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// A classified request body.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRequest {
    /// Endpoint handshake; needs no further action.
    Handshake,
    /// A decoded event and the instant it occurred.
    Event {
        event: Event,
        occurred_at: OffsetDateTime,
    },
    /// An event whose data block is missing or empty.
    EmptyData { kind: String },
    /// An event whose kind is not in the catalog.
    UnknownKind { kind: String },
}

/// Reasons a body cannot be classified.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid request body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event request without an event block")]
    MissingEvent,
    #[error("event request without a timestamp")]
    MissingTimestamp,
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
    #[error("invalid event timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("invalid {kind} data: {source}")]
    InvalidData {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Classify a raw request body.
pub fn decode(body: &[u8]) -> Result<DecodedRequest, DecodeError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(body)?;

    if envelope.request_type == RequestType::Handshake {
        return Ok(DecodedRequest::Handshake);
    }

    let event = envelope.event_body()?.ok_or(DecodeError::MissingEvent)?;
    if event.has_empty_data() {
        return Ok(DecodedRequest::EmptyData { kind: event.kind });
    }

    let kind = match event.kind.parse::<EventKind>() {
        Ok(kind) => kind,
        Err(_) => return Ok(DecodedRequest::UnknownKind { kind: event.kind }),
    };

    let occurred_at = match (envelope.ts, event.timestamp.as_deref()) {
        (Some(ts), _) => from_epoch_seconds(ts)?,
        (None, Some(timestamp)) => parse_event_timestamp(timestamp)?,
        (None, None) => return Err(DecodeError::MissingTimestamp),
    };

    let data = event.data.unwrap_or_default();
    let event =
        Event::decode(kind, data).map_err(|source| DecodeError::InvalidData { kind, source })?;

    Ok(DecodedRequest::Event { event, occurred_at })
}

/// Epoch seconds are UTC by definition.
pub fn from_epoch_seconds(ts: i64) -> Result<OffsetDateTime, DecodeError> {
    OffsetDateTime::from_unix_timestamp(ts).map_err(|_| DecodeError::TimestampOutOfRange(ts))
}

/// Parse an ISO 8601 event timestamp. Timestamps without an offset are
/// taken as UTC.
fn parse_event_timestamp(value: &str) -> Result<OffsetDateTime, DecodeError> {
    if let Ok(at) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(at);
    }
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .map(PrimitiveDateTime::assume_utc)
    .map_err(|_| DecodeError::InvalidTimestamp(value.to_owned()))
}
