use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::Result;

/// Inbound messages pushed by the relay endpoint.
///
/// Tagged by a `"type"` field. Event names are dotted
/// (`"stream.started"`, `"stream.frame"`, ...) except for the keep-alive
/// reply and the source listing. Messages with an unrecognized type
/// deserialize to `Unknown` and are ignored upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayEvent {
    /// Relay acknowledged the start command
    #[serde(rename = "stream.started")]
    Started,

    /// One decoded still image, base64 encoded without a data-URI prefix
    #[serde(rename = "stream.frame")]
    Frame { frame: String },

    /// Relay-side failure for the active stream
    #[serde(rename = "stream.error")]
    Error { message: String },

    /// Relay confirmed the stream was stopped
    #[serde(rename = "stream.stopped")]
    Stopped,

    /// Informational notice, no status impact
    #[serde(rename = "stream.warning")]
    Warning { message: String },

    /// Keep-alive reply, consumed by the lifecycle manager
    #[serde(rename = "pong")]
    Pong,

    /// Preconfigured source map (display name to source URL)
    #[serde(rename = "available_streams")]
    AvailableStreams { streams: HashMap<String, String> },

    /// Any message type this client does not recognize
    #[serde(other)]
    Unknown,
}

impl RelayEvent {
    /// Decode a JSON text frame
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode to a JSON text frame
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
