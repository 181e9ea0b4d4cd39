#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamStatus {
    /// No playback requested
    Idle,

    /// Start issued, waiting for the first frame
    Loading,

    /// Frames are arriving
    Playing,

    /// Relay or connection failure ended playback
    Error,

    /// Playback stopped on request
    Stopped,
}

impl StreamStatus {
    /// Check if a playback request is in flight or running
    pub fn is_active(&self) -> bool {
        matches!(self, StreamStatus::Loading | StreamStatus::Playing)
    }

    /// Check if inbound frames should be accepted.
    ///
    /// Frames arriving in any other status are late leftovers from a
    /// superseded session and must be discarded, not rendered.
    pub fn accepts_frames(&self) -> bool {
        matches!(self, StreamStatus::Loading | StreamStatus::Playing)
    }

    /// Check if play() may be issued from this status
    pub fn can_play(&self) -> bool {
        matches!(
            self,
            StreamStatus::Idle | StreamStatus::Stopped | StreamStatus::Error
        )
    }

    /// Validate transition
    pub fn can_transition_to(&self, next: StreamStatus) -> bool {
        match (*self, next) {
            (StreamStatus::Idle, StreamStatus::Loading) => true,
            // Local validation rejection, no start was ever issued
            (StreamStatus::Idle, StreamStatus::Error) => true,
            (StreamStatus::Loading, StreamStatus::Playing) => true,
            (StreamStatus::Loading, StreamStatus::Error) => true,
            (StreamStatus::Playing, StreamStatus::Playing) => true,
            (StreamStatus::Playing, StreamStatus::Error) => true,
            (StreamStatus::Loading, StreamStatus::Stopped) => true,
            (StreamStatus::Playing, StreamStatus::Stopped) => true,
            (StreamStatus::Error, StreamStatus::Stopped) => true,
            (StreamStatus::Stopped, StreamStatus::Loading) => true,
            (StreamStatus::Error, StreamStatus::Loading) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_acceptance() {
        assert!(StreamStatus::Loading.accepts_frames());
        assert!(StreamStatus::Playing.accepts_frames());
        assert!(!StreamStatus::Idle.accepts_frames());
        assert!(!StreamStatus::Stopped.accepts_frames());
        assert!(!StreamStatus::Error.accepts_frames());
    }

    #[test]
    fn test_transitions() {
        assert!(StreamStatus::Idle.can_transition_to(StreamStatus::Loading));
        assert!(StreamStatus::Loading.can_transition_to(StreamStatus::Playing));
        assert!(StreamStatus::Playing.can_transition_to(StreamStatus::Error));
        assert!(StreamStatus::Error.can_transition_to(StreamStatus::Loading));
        assert!(StreamStatus::Stopped.can_transition_to(StreamStatus::Loading));

        assert!(!StreamStatus::Idle.can_transition_to(StreamStatus::Playing));
        assert!(!StreamStatus::Stopped.can_transition_to(StreamStatus::Playing));
    }
}
