use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored stream configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub id: i64,

    /// Display name
    pub name: String,

    /// Source address handed to the relay on playback
    pub url: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Whether the record shows up in stream pickers
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a stream configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfigInput {
    pub name: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub active: bool,
}

impl StreamConfigInput {
    /// Create an active record with no description
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        StreamConfigInput {
            name: name.into(),
            url: url.into(),
            description: None,
            active: true,
        }
    }
}
