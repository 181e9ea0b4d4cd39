use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use log::{debug, error, info, warn};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at, timeout};
use url::Url;

use crate::client::ClientConfig;
use crate::protocol::constants::{CLOSE_ABNORMAL, CLOSE_NORMAL, is_abnormal_close};
use crate::protocol::{RelayCommand, RelayEvent};
use crate::transport::{Transport, TransportConnector, TransportEvent};
use crate::utils::BackoffPolicy;
use crate::{Error, Result};
use super::ConnectionState;

/// Events the lifecycle manager surfaces to the session layer.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Transport established and ready
    Open,

    /// Decoded inbound event; keep-alive replies are swallowed before this
    Message(RelayEvent),

    /// Transport dropped with the given close code
    Closed { code: u16 },

    /// Retry budget exhausted; reconnection stopped until connect() is
    /// called again
    ReconnectFailed { attempts: u32 },
}

/// Owns the transport to the relay endpoint and keeps it alive.
///
/// Reconnects with exponential backoff on abnormal closure, sends periodic
/// keep-alives, and force-closes half-open transports that go silent. Only
/// this manager creates, destroys, or replaces the transport object.
#[derive(Clone)]
pub struct ConnectionManager {
    /// Relay endpoint
    endpoint: Url,

    /// Client configuration
    config: Arc<ClientConfig>,

    /// Transport factory
    connector: Arc<dyn TransportConnector>,

    /// Lifecycle state
    state: Arc<RwLock<ConnectionState>>,

    /// Active transport, replaced across reconnects
    transport: Arc<RwLock<Option<Arc<dyn Transport>>>>,

    /// Set when the closure was requested locally, suppressing retry
    intentional: Arc<AtomicBool>,

    /// Reconnect delay schedule
    backoff: BackoffPolicy,

    /// Event fan-out to the session layer
    events_tx: mpsc::Sender<ConnectionEvent>,
    events_rx: Arc<RwLock<Option<mpsc::Receiver<ConnectionEvent>>>>,

    /// Driver task handle
    driver: Arc<RwLock<Option<JoinHandle<()>>>>,

    /// Shutdown signal for the driver
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Arc<RwLock<mpsc::Receiver<()>>>,
}

impl ConnectionManager {
    /// Create a new manager for the given endpoint
    pub fn new(
        endpoint: Url,
        config: Arc<ClientConfig>,
        connector: Arc<dyn TransportConnector>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let backoff = BackoffPolicy::new(config.base_delay, config.growth_factor, config.max_delay);

        ConnectionManager {
            endpoint,
            config,
            connector,
            state: Arc::new(RwLock::new(ConnectionState::Uninstantiated)),
            transport: Arc::new(RwLock::new(None)),
            intentional: Arc::new(AtomicBool::new(false)),
            backoff,
            events_tx,
            events_rx: Arc::new(RwLock::new(Some(events_rx))),
            driver: Arc::new(RwLock::new(None)),
            shutdown_tx,
            shutdown_rx: Arc::new(RwLock::new(shutdown_rx)),
        }
    }

    /// Take the event receiver; available exactly once
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        let mut slot = self.events_rx.write().await;
        slot.take()
    }

    /// Get current state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Check if the transport is usable
    pub async fn is_open(&self) -> bool {
        self.state().await.is_open()
    }

    /// Start the connection driver.
    ///
    /// No-op while a driver is already connecting, connected, or waiting
    /// out a reconnect delay. After a terminal retry failure or an
    /// intentional disconnect, calling this again starts a fresh driver
    /// with a reset retry budget.
    pub async fn connect(&self) -> Result<()> {
        {
            let driver = self.driver.read().await;
            if let Some(handle) = driver.as_ref() {
                if !handle.is_finished() {
                    return Ok(());
                }
            }
        }

        self.intentional.store(false, Ordering::SeqCst);

        // Drop any stale shutdown signal from a previous disconnect
        {
            let mut rx = self.shutdown_rx.write().await;
            while rx.try_recv().is_ok() {}
        }

        {
            let mut state = self.state.write().await;
            *state = ConnectionState::Connecting;
        }

        let manager = self.clone();
        let handle = tokio::spawn(async move {
            manager.drive().await;
        });

        {
            let mut driver = self.driver.write().await;
            *driver = Some(handle);
        }

        Ok(())
    }

    /// Close the transport intentionally; automatic retry is suppressed
    pub async fn disconnect(&self) -> Result<()> {
        self.intentional.store(true, Ordering::SeqCst);

        {
            let mut state = self.state.write().await;
            if !state.is_closed() {
                *state = ConnectionState::Closing;
            }
        }

        let transport = {
            let slot = self.transport.read().await;
            slot.clone()
        };
        if let Some(transport) = transport {
            let _ = transport.close().await;
        }

        let _ = self.shutdown_tx.try_send(());

        // With no driver alive there is nobody left to confirm the close
        let driver_done = {
            let driver = self.driver.read().await;
            driver.as_ref().map(|h| h.is_finished()).unwrap_or(true)
        };
        if driver_done {
            let mut state = self.state.write().await;
            *state = ConnectionState::Closed;
        }

        Ok(())
    }

    /// Send one text frame over the active transport
    pub async fn send(&self, text: &str) -> Result<()> {
        let transport = {
            let slot = self.transport.read().await;
            slot.clone()
        };

        match transport {
            Some(transport) if self.is_open().await => transport.send(text).await,
            _ => Err(Error::invalid_state("Transport not open")),
        }
    }

    /// Connect/reconnect loop; runs until intentional close, clean server
    /// close, or retry exhaustion
    async fn drive(&self) {
        let mut attempts: u32 = 0;

        loop {
            {
                let mut state = self.state.write().await;
                *state = ConnectionState::Connecting;
            }

            let connected = timeout(
                self.config.connect_timeout,
                self.connector.connect(&self.endpoint),
            )
            .await;

            match connected {
                Ok(Ok(transport)) => {
                    {
                        let mut slot = self.transport.write().await;
                        *slot = Some(transport.clone());
                    }
                    {
                        let mut state = self.state.write().await;
                        *state = ConnectionState::Open;
                    }
                    attempts = 0;
                    info!("Connected to relay endpoint {}", self.endpoint);
                    self.emit(ConnectionEvent::Open).await;

                    let code = self.run_connection(transport).await;

                    {
                        let mut slot = self.transport.write().await;
                        *slot = None;
                    }

                    if self.intentional.load(Ordering::SeqCst) {
                        let mut state = self.state.write().await;
                        *state = ConnectionState::Closed;
                        self.emit(ConnectionEvent::Closed { code: CLOSE_NORMAL }).await;
                        return;
                    }

                    self.emit(ConnectionEvent::Closed { code }).await;

                    if !is_abnormal_close(code) {
                        // Server closed cleanly; not a failure, so no retry
                        let mut state = self.state.write().await;
                        *state = ConnectionState::Closed;
                        return;
                    }

                    warn!("Transport closed abnormally (code {})", code);
                }
                Ok(Err(e)) => {
                    warn!("Connect to {} failed: {}", self.endpoint, e);
                }
                Err(_) => {
                    warn!(
                        "Connect to {} timed out after {:?}",
                        self.endpoint, self.config.connect_timeout
                    );
                }
            }

            if self.intentional.load(Ordering::SeqCst) {
                let mut state = self.state.write().await;
                *state = ConnectionState::Closed;
                return;
            }

            if attempts >= self.config.max_reconnect_attempts {
                error!("Giving up after {} reconnect attempts", attempts);
                {
                    let mut state = self.state.write().await;
                    *state = ConnectionState::Closed;
                }
                self.emit(ConnectionEvent::ReconnectFailed { attempts }).await;
                return;
            }

            let delay = self.backoff.jittered_delay(attempts);
            attempts += 1;
            debug!("Reconnect attempt {} in {:?}", attempts, delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.wait_shutdown() => {
                    let mut state = self.state.write().await;
                    *state = ConnectionState::Closed;
                    return;
                }
            }
        }
    }

    /// Pump one established transport until it closes.
    ///
    /// Returns the close code. Heartbeats go out on a fixed interval; the
    /// same tick checks liveness so a half-open transport that went silent
    /// is force-closed and handed to the retry path.
    async fn run_connection(&self, transport: Arc<dyn Transport>) -> u16 {
        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_inbound = Instant::now();

        loop {
            tokio::select! {
                event = transport.recv() => {
                    match event {
                        Some(TransportEvent::Message(text)) => {
                            last_inbound = Instant::now();
                            self.handle_message(&text).await;
                        }
                        Some(TransportEvent::Closed(code)) => return code,
                        Some(TransportEvent::Error(reason)) => {
                            warn!("Transport error: {}", reason);
                        }
                        None => return CLOSE_ABNORMAL,
                    }
                }
                _ = heartbeat.tick() => {
                    if last_inbound.elapsed() > self.config.liveness_timeout {
                        warn!(
                            "No inbound message for {:?}, forcing reconnect",
                            self.config.liveness_timeout
                        );
                        let _ = transport.close().await;
                        return CLOSE_ABNORMAL;
                    }

                    match RelayCommand::Ping.encode() {
                        Ok(ping) => {
                            if transport.send(&ping).await.is_err() {
                                return CLOSE_ABNORMAL;
                            }
                        }
                        Err(e) => warn!("Failed to encode keep-alive: {}", e),
                    }
                }
                _ = self.wait_shutdown() => {
                    let _ = transport.close().await;
                    return CLOSE_NORMAL;
                }
            }
        }
    }

    /// Decode one inbound frame and forward it upstream
    async fn handle_message(&self, text: &str) {
        match RelayEvent::decode(text) {
            Ok(RelayEvent::Pong) => {
                debug!("Keep-alive reply received");
            }
            Ok(RelayEvent::Unknown) => {
                debug!("Ignoring message with unrecognized type");
            }
            Ok(event) => {
                self.emit(ConnectionEvent::Message(event)).await;
            }
            Err(e) => {
                // Recoverable glitch, never a session failure
                warn!("Dropping unparseable message: {}", e);
            }
        }
    }

    async fn emit(&self, event: ConnectionEvent) {
        let _ = self.events_tx.send(event).await;
    }

    /// Wait for a shutdown signal
    async fn wait_shutdown(&self) {
        let mut rx = self.shutdown_rx.write().await;
        let _ = rx.recv().await;
    }
}
