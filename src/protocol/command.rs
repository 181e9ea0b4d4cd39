use serde::{Deserialize, Serialize};
use crate::Result;

/// Outbound commands sent to the relay endpoint.
///
/// Serialized as JSON objects tagged by an `"action"` field, e.g.
/// `{"action":"start_stream","rtsp_url":"rtsp://..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RelayCommand {
    /// Ask the relay to ingest a source and push frames
    StartStream { rtsp_url: String },

    /// Stop the active stream on this connection
    StopStream,

    /// Keep-alive probe
    Ping,

    /// Request the relay's preconfigured source map
    GetAvailableStreams,
}

impl RelayCommand {
    /// Build a start command for the given source URL
    pub fn start(rtsp_url: impl Into<String>) -> Self {
        RelayCommand::StartStream {
            rtsp_url: rtsp_url.into(),
        }
    }

    /// Encode to a JSON text frame
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON text frame
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
