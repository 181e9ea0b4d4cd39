use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, error, info, warn};
use tokio::sync::{RwLock, mpsc};

use crate::client::{ClientConfig, ClientEvent};
use crate::connection::ConnectionManager;
use crate::frame::{FramePayload, FrameSink, decode_frame};
use crate::protocol::constants::is_abnormal_close;
use crate::protocol::{RelayCommand, RelayEvent};
use crate::utils::{elapsed_ms, monotonic_ms};
use crate::{Error, Result};
use super::{StreamSession, StreamStatus};

/// Translates playback intents into relay commands and inbound events
/// into session status transitions.
///
/// All transitions are driven by events arriving in any order; events that
/// do not fit the current status are ignored rather than treated as
/// failures. The controller never touches the transport directly; every
/// send re-checks the lifecycle manager first.
#[derive(Clone)]
pub struct SessionController {
    /// Client configuration
    config: Arc<ClientConfig>,

    /// Connection lifecycle manager
    manager: Arc<ConnectionManager>,

    /// Active session record
    session: Arc<RwLock<StreamSession>>,

    /// Start command waiting for the transport to open
    pending_start: Arc<RwLock<Option<String>>>,

    /// Frame consumer
    sink: Arc<dyn FrameSink>,

    /// Most recent accepted frame, cleared on stop
    last_frame: Arc<RwLock<Option<FramePayload>>>,

    /// Cached relay source map
    available: Arc<RwLock<HashMap<String, String>>>,

    /// Status event fan-out, best effort
    events_tx: mpsc::Sender<ClientEvent>,
}

impl SessionController {
    /// Create a controller on top of the given lifecycle manager
    pub fn new(
        config: Arc<ClientConfig>,
        manager: Arc<ConnectionManager>,
        sink: Arc<dyn FrameSink>,
        events_tx: mpsc::Sender<ClientEvent>,
    ) -> Self {
        SessionController {
            config,
            manager,
            session: Arc::new(RwLock::new(StreamSession::new())),
            pending_start: Arc::new(RwLock::new(None)),
            sink,
            last_frame: Arc::new(RwLock::new(None)),
            available: Arc::new(RwLock::new(HashMap::new())),
            events_tx,
        }
    }

    /// Request playback of the given source URL.
    ///
    /// An empty or non-rtsp URL is rejected locally without any network
    /// activity. With the transport open the start command goes out
    /// immediately; otherwise it is buffered and flushed once the
    /// lifecycle manager reports the transport open.
    pub async fn play(&self, url: &str) -> Result<()> {
        {
            let mut session = self.session.write().await;
            session.recover_attempts = 0;
        }
        self.start_session(url).await
    }

    /// Stop playback.
    ///
    /// Always locally satisfiable: status moves to stopped and the cached
    /// frame is cleared even when the transport is down. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut pending = self.pending_start.write().await;
            *pending = None;
        }
        {
            let mut frame = self.last_frame.write().await;
            *frame = None;
        }

        if self.manager.is_open().await {
            match RelayCommand::StopStream.encode() {
                Ok(text) => {
                    if let Err(e) = self.manager.send(&text).await {
                        debug!("stop_stream send failed: {}", e);
                    }
                }
                Err(e) => warn!("Failed to encode stop command: {}", e),
            }
        }

        self.set_status(StreamStatus::Stopped).await;
        Ok(())
    }

    /// Ask the relay for its preconfigured source map
    pub async fn request_available_streams(&self) -> Result<()> {
        let text = RelayCommand::GetAvailableStreams.encode()?;
        self.manager.send(&text).await
    }

    /// Handle one inbound relay event
    pub async fn handle_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::Started => {
                let mut session = self.session.write().await;
                if session.status == StreamStatus::Loading {
                    // The first frame, not the ack, confirms playback
                    session.last_error = None;
                } else {
                    debug!("Ignoring start ack in status {:?}", session.status);
                }
            }
            RelayEvent::Frame { frame } => self.handle_frame(&frame).await,
            RelayEvent::Error { message } => self.handle_error(message).await,
            RelayEvent::Stopped => {
                self.set_status(StreamStatus::Stopped).await;
            }
            RelayEvent::Warning { message } => {
                warn!("Relay warning: {}", message);
                let _ = self.events_tx.try_send(ClientEvent::Warning(message));
            }
            RelayEvent::AvailableStreams { streams } => {
                {
                    let mut available = self.available.write().await;
                    *available = streams.clone();
                }
                let _ = self.events_tx.try_send(ClientEvent::AvailableStreams(streams));
            }
            RelayEvent::Pong | RelayEvent::Unknown => {}
        }
    }

    /// Flush the buffered start once the transport is open
    pub async fn on_transport_open(&self) {
        let pending = {
            let mut slot = self.pending_start.write().await;
            slot.take()
        };

        if let Some(url) = pending {
            info!("Transport open, sending buffered start for {}", url);
            self.send_start(&url).await;
        }
    }

    /// React to a transport drop.
    ///
    /// An abnormal drop while a session is active re-arms the buffered
    /// start so the stream resumes once the manager reconnects. A clean
    /// close leaves the session alone.
    pub async fn on_transport_closed(&self, code: u16) {
        if !is_abnormal_close(code) {
            return;
        }

        let target = {
            let session = self.session.read().await;
            if session.status.is_active() && !session.target_url.is_empty() {
                Some(session.target_url.clone())
            } else {
                None
            }
        };

        if let Some(url) = target {
            let mut pending = self.pending_start.write().await;
            if pending.is_none() {
                debug!("Re-arming start for {} after transport drop", url);
                *pending = Some(url);
            }
        }
    }

    /// React to the lifecycle manager giving up on reconnection
    pub async fn on_reconnect_failed(&self, attempts: u32) {
        {
            let mut pending = self.pending_start.write().await;
            *pending = None;
        }

        let active = {
            let session = self.session.read().await;
            session.status.is_active()
        };
        if active {
            {
                let mut session = self.session.write().await;
                session.last_error =
                    Some(format!("Connection failed after {} attempts", attempts));
            }
            self.set_status(StreamStatus::Error).await;
        }
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> StreamSession {
        self.session.read().await.clone()
    }

    /// Current playback status
    pub async fn status(&self) -> StreamStatus {
        self.session.read().await.status
    }

    /// Most recent accepted frame, if any
    pub async fn latest_frame(&self) -> Option<FramePayload> {
        self.last_frame.read().await.clone()
    }

    /// Cached relay source map
    pub async fn available_streams(&self) -> HashMap<String, String> {
        self.available.read().await.clone()
    }

    /// Check whether frames stopped arriving while playing.
    ///
    /// Staleness is an indicator only; the session status is untouched.
    pub async fn is_stale(&self) -> bool {
        let session = self.session.read().await;
        if session.status != StreamStatus::Playing {
            return false;
        }
        match session.last_frame_ms {
            Some(ts) => {
                elapsed_ms(ts, monotonic_ms()) > self.config.stale_after.as_millis() as u64
            }
            None => false,
        }
    }

    async fn start_session(&self, url: &str) -> Result<()> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(self.fail_local("No stream URL provided").await);
        }
        if !trimmed.starts_with("rtsp://") {
            return Err(
                self.fail_local(format!("Not an rtsp:// URL: {}", trimmed)).await,
            );
        }

        {
            let mut session = self.session.write().await;
            session.begin(trimmed);
        }
        let _ = self.events_tx.try_send(ClientEvent::Status(StreamStatus::Loading));

        if self.manager.is_open().await {
            self.send_start(trimmed).await;
        } else {
            {
                let mut pending = self.pending_start.write().await;
                *pending = Some(trimmed.to_string());
            }
            self.manager.connect().await?;

            // The transport may have opened while the start was being
            // buffered; flush instead of waiting for an open event that
            // already fired
            if self.manager.is_open().await {
                self.on_transport_open().await;
            }
        }

        Ok(())
    }

    async fn send_start(&self, url: &str) {
        let command = RelayCommand::start(url);
        match command.encode() {
            Ok(text) => {
                if let Err(e) = self.manager.send(&text).await {
                    // The transport raced shut; the reconnect path flushes it
                    debug!("start_stream send failed, re-buffering: {}", e);
                    let mut pending = self.pending_start.write().await;
                    *pending = Some(url.to_string());
                }
            }
            Err(e) => warn!("Failed to encode start command: {}", e),
        }
    }

    async fn handle_frame(&self, encoded: &str) {
        let accepting = {
            let session = self.session.read().await;
            session.status.accepts_frames()
        };
        if !accepting {
            debug!("Discarding frame outside an active session");
            return;
        }

        match decode_frame(encoded) {
            Ok(payload) => {
                {
                    let mut frame = self.last_frame.write().await;
                    *frame = Some(payload.clone());
                }
                if let Err(e) = self.sink.render(&payload).await {
                    // Per-frame problem; prior frame stays displayed
                    warn!("Renderer rejected frame: {}", e);
                }
                {
                    let mut session = self.session.write().await;
                    session.last_frame_ms = Some(monotonic_ms());
                }
                self.set_status(StreamStatus::Playing).await;
            }
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                let mut session = self.session.write().await;
                session.decode_failures += 1;
            }
        }
    }

    async fn handle_error(&self, message: String) {
        let transition = {
            let session = self.session.read().await;
            session.status.is_active()
        };
        if !transition {
            debug!("Ignoring relay error outside an active session");
            return;
        }

        error!("Stream failed: {}", message);
        {
            let mut session = self.session.write().await;
            session.last_error = Some(message);
        }
        self.set_status(StreamStatus::Error).await;

        if self.config.auto_recover {
            self.schedule_recovery().await;
        }
    }

    /// Replay the failed target after a fixed delay, within budget
    async fn schedule_recovery(&self) {
        let (target, session_id) = {
            let mut session = self.session.write().await;
            if session.recover_attempts >= self.config.max_reconnect_attempts {
                debug!("Auto-recovery budget exhausted");
                return;
            }
            session.recover_attempts += 1;
            (session.target_url.clone(), session.id)
        };

        let controller = self.clone();
        let delay = self.config.recover_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let still_failed = {
                let session = controller.session.read().await;
                session.id == session_id && session.status == StreamStatus::Error
            };
            if still_failed {
                info!("Auto-recovery replaying {}", target);
                if let Err(e) = controller.start_session(&target).await {
                    warn!("Auto-recovery failed: {}", e);
                }
            }
        });
    }

    async fn fail_local(&self, message: impl Into<String>) -> Error {
        let message = message.into();
        {
            let mut session = self.session.write().await;
            session.last_error = Some(message.clone());
        }
        self.set_status(StreamStatus::Error).await;
        Error::validation(message)
    }

    async fn set_status(&self, status: StreamStatus) {
        let changed = {
            let mut session = self.session.write().await;
            if session.status == status {
                false
            } else {
                session.status = status;
                true
            }
        };
        if changed {
            let _ = self.events_tx.try_send(ClientEvent::Status(status));
        }
    }
}
