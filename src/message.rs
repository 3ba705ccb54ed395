//! Decoded telemetry messages
//!
//! Frame decoding happens in the transport layer; by the time a message
//! reaches this crate it is a typed record with arbitrary payload fields.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of the periodic liveness frame.
pub const HEARTBEAT_TYPE: &str = "HEARTBEAT";

/// One decoded unit from the telemetry stream.
///
/// Messages are immutable once constructed: handlers receive a shared
/// reference for the duration of a dispatch pass and must copy anything
/// they want to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message type tag
    message_type: String,
    /// Decoded payload fields
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
    /// Original encoded frame, when the transport retains it
    #[serde(skip)]
    raw: Option<Bytes>,
}

impl Message {
    /// Create a message with an empty payload
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            fields: serde_json::Map::new(),
            raw: None,
        }
    }

    /// Create a heartbeat message
    pub fn heartbeat() -> Self {
        Self::new(HEARTBEAT_TYPE)
    }

    /// Attach a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Attach the original encoded frame
    pub fn with_raw(mut self, raw: Bytes) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Get the message type tag
    pub fn get_type(&self) -> &str {
        &self.message_type
    }

    /// Look up a payload field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All payload fields
    pub fn fields(&self) -> &serde_json::Map<String, Value> {
        &self.fields
    }

    /// Original encoded frame, if retained by the transport
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({} fields)", self.message_type, self.fields.len())
    }
}
