use uuid::Uuid;

use super::StreamStatus;

/// One logical playback request for one target URL.
///
/// Sessions are tagged with a fresh id on every start so events and timers
/// belonging to a superseded session can be told apart from current ones.
#[derive(Debug, Clone)]
pub struct StreamSession {
    /// Session tag
    pub id: Uuid,

    /// Source address requested for relay; opaque beyond a prefix check
    pub target_url: String,

    /// Playback status
    pub status: StreamStatus,

    /// Most recent failure message
    pub last_error: Option<String>,

    /// Monotonic milliseconds of the most recently accepted frame
    pub last_frame_ms: Option<u64>,

    /// Malformed frame payloads seen this session
    pub decode_failures: u64,

    /// Automatic replays consumed after relay errors
    pub recover_attempts: u32,
}

impl StreamSession {
    /// Create an idle session with no target
    pub fn new() -> Self {
        StreamSession {
            id: Uuid::new_v4(),
            target_url: String::new(),
            status: StreamStatus::Idle,
            last_error: None,
            last_frame_ms: None,
            decode_failures: 0,
            recover_attempts: 0,
        }
    }

    /// Start a session for the given target.
    ///
    /// Re-tags the session and moves to loading; the recovery budget is
    /// left alone so automatic replays stay bounded.
    pub fn begin(&mut self, target_url: &str) {
        self.id = Uuid::new_v4();
        self.target_url = target_url.to_string();
        self.status = StreamStatus::Loading;
        self.last_error = None;
        self.last_frame_ms = None;
        self.decode_failures = 0;
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        StreamSession::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_retags_and_resets() {
        let mut session = StreamSession::new();
        session.last_error = Some("old failure".to_string());
        session.decode_failures = 4;
        let old_id = session.id;

        session.begin("rtsp://cam1/live");

        assert_ne!(session.id, old_id);
        assert_eq!(session.target_url, "rtsp://cam1/live");
        assert_eq!(session.status, StreamStatus::Loading);
        assert!(session.last_error.is_none());
        assert!(session.last_frame_ms.is_none());
        assert_eq!(session.decode_failures, 0);
    }
}
