//! Outbound frame format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use seatswap_core::SessionId;

/// A frame pushed to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEvent {
    /// Event type (e.g. `session.updated`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Associated session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl LiveEvent {
    /// Build an event stamped with the current time.
    pub fn new(event_type: impl Into<String>, session_id: Option<SessionId>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            session_id,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            data: (!data.is_null()).then_some(data),
        }
    }

    /// Serialize to a wire frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
