use std::collections::HashMap;
use std::sync::Arc;
use log::debug;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use url::Url;

use crate::client::config::ClientConfig;
use crate::client::event::ClientEvent;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::frame::{FramePayload, FrameSink};
use crate::session::{SessionController, StreamSession, StreamStatus};
use crate::transport::{TcpConnector, TransportConnector};
use crate::{Error, Result};

/// Owned client for one relay connection and its playback session.
///
/// Construct one instance per viewed stream, call `init()` to bring the
/// connection up, and `dispose()` to tear everything down. Nothing here is
/// global; multiple clients coexist, each with its own transport.
pub struct RelayClient {
    /// Client configuration
    config: Arc<ClientConfig>,

    /// Connection lifecycle manager
    manager: Arc<ConnectionManager>,

    /// Session controller
    controller: SessionController,

    /// Event fan-out to the rendering layer
    events_tx: mpsc::Sender<ClientEvent>,
    events_rx: Arc<RwLock<Option<mpsc::Receiver<ClientEvent>>>>,

    /// Background tasks, aborted on dispose
    tasks: Arc<RwLock<Vec<JoinHandle<()>>>>,
}

impl RelayClient {
    /// Create a client for the given relay endpoint
    pub fn new(endpoint: &str, sink: Arc<dyn FrameSink>) -> Result<Self> {
        RelayClient::with_config(endpoint, ClientConfig::default(), sink)
    }

    /// Create a client with explicit configuration
    pub fn with_config(
        endpoint: &str,
        config: ClientConfig,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid endpoint URL: {}", e)))?;

        match parsed.scheme() {
            "tcp" => {}
            scheme => {
                return Err(Error::config(format!(
                    "Unsupported endpoint scheme: {}",
                    scheme
                )));
            }
        }

        let connector = Arc::new(TcpConnector::new(config.connect_timeout));
        RelayClient::with_connector(parsed, config, connector, sink)
    }

    /// Create a client over a custom transport connector
    pub fn with_connector(
        endpoint: Url,
        config: ClientConfig,
        connector: Arc<dyn TransportConnector>,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
        let manager = Arc::new(ConnectionManager::new(
            endpoint,
            config.clone(),
            connector,
        ));
        let controller = SessionController::new(
            config.clone(),
            manager.clone(),
            sink,
            events_tx.clone(),
        );

        Ok(RelayClient {
            config,
            manager,
            controller,
            events_tx,
            events_rx: Arc::new(RwLock::new(Some(events_rx))),
            tasks: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Start background processing and bring the connection up.
    ///
    /// Idempotent; calling it again on a running client does nothing.
    pub async fn init(&self) -> Result<()> {
        let Some(mut manager_events) = self.manager.take_events().await else {
            return Ok(());
        };

        // Pump: route lifecycle events into the session controller
        let controller = self.controller.clone();
        let events_tx = self.events_tx.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = manager_events.recv().await {
                match event {
                    ConnectionEvent::Open => controller.on_transport_open().await,
                    ConnectionEvent::Message(message) => {
                        controller.handle_event(message).await;
                    }
                    ConnectionEvent::Closed { code } => {
                        controller.on_transport_closed(code).await;
                        let _ = events_tx.try_send(ClientEvent::ConnectionClosed { code });
                    }
                    ConnectionEvent::ReconnectFailed { attempts } => {
                        controller.on_reconnect_failed(attempts).await;
                        let _ = events_tx.try_send(ClientEvent::ReconnectFailed { attempts });
                    }
                }
            }
            debug!("Lifecycle event stream ended");
        });

        // Staleness watcher: edge-triggered indicator, status untouched
        let controller = self.controller.clone();
        let events_tx = self.events_tx.clone();
        let period = (self.config.stale_after / 4).max(std::time::Duration::from_millis(50));
        let watcher = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut was_stale = false;
            loop {
                ticker.tick().await;
                let stale = controller.is_stale().await;
                if stale != was_stale {
                    was_stale = stale;
                    let _ = events_tx.try_send(ClientEvent::Stale(stale));
                }
            }
        });

        {
            let mut tasks = self.tasks.write().await;
            tasks.push(pump);
            tasks.push(watcher);
        }

        self.manager.connect().await
    }

    /// Tear down the session, the connection, and background tasks
    pub async fn dispose(&self) -> Result<()> {
        let _ = self.controller.stop().await;
        self.manager.disconnect().await?;

        let mut tasks = self.tasks.write().await;
        for task in tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }

    /// Take the client event receiver; available exactly once
    pub async fn events(&self) -> Option<mpsc::Receiver<ClientEvent>> {
        let mut slot = self.events_rx.write().await;
        slot.take()
    }

    /// Request playback of a source URL
    pub async fn play(&self, url: &str) -> Result<()> {
        self.controller.play(url).await
    }

    /// Stop playback
    pub async fn stop(&self) -> Result<()> {
        self.controller.stop().await
    }

    /// Ask the relay for its preconfigured source map
    pub async fn request_available_streams(&self) -> Result<()> {
        self.controller.request_available_streams().await
    }

    /// Cached relay source map
    pub async fn available_streams(&self) -> HashMap<String, String> {
        self.controller.available_streams().await
    }

    /// Current playback status
    pub async fn status(&self) -> StreamStatus {
        self.controller.status().await
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> StreamSession {
        self.controller.session().await
    }

    /// Most recent accepted frame, if any
    pub async fn latest_frame(&self) -> Option<FramePayload> {
        self.controller.latest_frame().await
    }

    /// Check whether frames stopped arriving while playing
    pub async fn is_stale(&self) -> bool {
        self.controller.is_stale().await
    }

    /// Current connection lifecycle state
    pub async fn connection_state(&self) -> ConnectionState {
        self.manager.state().await
    }
}
