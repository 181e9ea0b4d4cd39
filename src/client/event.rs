use std::collections::HashMap;

use crate::session::StreamStatus;

/// Events surfaced to the rendering layer.
///
/// Delivery is best effort: state is always queryable on the client, so a
/// full event buffer drops notifications instead of stalling playback.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Session status changed
    Status(StreamStatus),

    /// Relay-side advisory notice
    Warning(String),

    /// Frames stopped arriving while playing (true) or resumed (false)
    Stale(bool),

    /// Transport dropped with the given close code
    ConnectionClosed { code: u16 },

    /// Reconnect budget exhausted
    ReconnectFailed { attempts: u32 },

    /// Relay source map received
    AvailableStreams(HashMap<String, String>),
}
