//! Wire shape of a webhook request body.
//!
//! ```json
//! {
//!   "type": 0,
//!   "event": {
//!     "type": "APPLICATION_AUTHORIZED",
//!     "timestamp": "2024-10-18T14:42:53.064834",
//!     "data": { ... }
//!   },
//!   "ts": 1700000000
//! }
//! ```
//!
//! Fields not listed here (`version`, `application_id`, ...) are ignored.

use serde::Deserialize;
use serde_json::Value;

/// Top-level request-type marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "i64")]
pub enum RequestType {
    /// `0`: an event notification.
    Event,
    /// `1`: an endpoint handshake, sent when the URL is configured.
    Handshake,
}

impl TryFrom<i64> for RequestType {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Event),
            1 => Ok(Self::Handshake),
            other => Err(format!("unknown request type {other}")),
        }
    }
}

/// The raw envelope, before any classification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    /// Left undecoded so a handshake never fails on its event block.
    #[serde(default)]
    pub event: Option<Value>,
    /// Occurrence time in epoch seconds.
    #[serde(default)]
    pub ts: Option<i64>,
}

impl WebhookEnvelope {
    /// Decode the `event` block. `None` when it is missing or `null`.
    pub fn event_body(&self) -> Result<Option<EventBody>, serde_json::Error> {
        match &self.event {
            None | Some(Value::Null) => Ok(None),
            Some(event) => EventBody::deserialize(event).map(Some),
        }
    }
}

/// The `event` block of an event request.
#[derive(Debug, Clone, Deserialize)]
pub struct EventBody {
    #[serde(rename = "type")]
    pub kind: String,
    /// Occurrence time as an RFC 3339 string, used when `ts` is absent.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl EventBody {
    /// A missing data block, or one holding a falsy value: `null`,
    /// `false`, `0`, `""`, `[]` or `{}`.
    pub fn has_empty_data(&self) -> bool {
        match &self.data {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => !b,
            Some(Value::Number(n)) => n.as_f64() == Some(0.0),
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(map)) => map.is_empty(),
        }
    }
}
