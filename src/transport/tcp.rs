use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{RwLock, mpsc};
use tokio::time::timeout;
use url::Url;

use crate::protocol::constants::{CLOSE_ABNORMAL, CLOSE_NORMAL, DEFAULT_RELAY_PORT};
use crate::transport::{Transport, TransportConnector, TransportEvent};
use crate::{Error, Result};

/// Newline-delimited JSON text frames over a TCP stream.
///
/// The relay endpoint speaks one JSON object per line in each direction.
/// Close codes follow the WebSocket convention: 1000 for closures this side
/// requested, 1006 for peer EOF and transport faults.
pub struct TcpTransport {
    /// Write half, shared with senders
    writer: Arc<RwLock<OwnedWriteHalf>>,

    /// Inbound event stream fed by the read task
    events: Arc<RwLock<mpsc::Receiver<TransportEvent>>>,

    /// Set once close() was requested locally
    closed: Arc<AtomicBool>,

    /// Lets close() unblock the owner without waiting for peer EOF
    events_tx: mpsc::Sender<TransportEvent>,
}

impl TcpTransport {
    /// Open a transport to the endpoint with a connect timeout
    pub async fn open(endpoint: &Url, connect_timeout: Duration) -> Result<Self> {
        let host = endpoint
            .host_str()
            .ok_or_else(|| Error::config("Missing host in endpoint URL"))?;
        let port = endpoint.port().unwrap_or(DEFAULT_RELAY_PORT);
        let addr = format!("{}:{}", host, port);

        // Connect with timeout
        let stream = match timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::connection(format!(
                    "Failed to connect to {}: {}",
                    addr, e
                )));
            }
            Err(_) => return Err(Error::timeout(format!("Connect to {} timed out", addr))),
        };

        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let (events_tx, events_rx) = mpsc::channel(256);
        let closed = Arc::new(AtomicBool::new(false));

        // Read task: one text frame per line until EOF or fault
        let tx = events_tx.clone();
        let closed_flag = closed.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(TransportEvent::Message(line)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let code = if closed_flag.load(Ordering::SeqCst) {
                            CLOSE_NORMAL
                        } else {
                            CLOSE_ABNORMAL
                        };
                        let _ = tx.send(TransportEvent::Closed(code)).await;
                        break;
                    }
                    Err(e) => {
                        if !closed_flag.load(Ordering::SeqCst) {
                            let _ = tx.send(TransportEvent::Error(e.to_string())).await;
                            let _ = tx.send(TransportEvent::Closed(CLOSE_ABNORMAL)).await;
                        } else {
                            let _ = tx.send(TransportEvent::Closed(CLOSE_NORMAL)).await;
                        }
                        break;
                    }
                }
            }
        });

        Ok(TcpTransport {
            writer: Arc::new(RwLock::new(write_half)),
            events: Arc::new(RwLock::new(events_rx)),
            closed,
            events_tx,
        })
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&self, text: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::transport("Transport already closed"));
        }

        let mut writer = self.writer.write().await;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv(&self) -> Option<TransportEvent> {
        let mut events = self.events.write().await;
        events.recv().await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        {
            let mut writer = self.writer.write().await;
            let _ = writer.shutdown().await;
        }

        // Unblock the owner immediately instead of waiting for peer EOF
        let _ = self.events_tx.send(TransportEvent::Closed(CLOSE_NORMAL)).await;
        Ok(())
    }
}

/// Connector producing one `TcpTransport` per attempt.
pub struct TcpConnector {
    /// Connect timeout per attempt
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Create a connector with the given connect timeout
    pub fn new(connect_timeout: Duration) -> Self {
        TcpConnector { connect_timeout }
    }
}

#[async_trait::async_trait]
impl TransportConnector for TcpConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn Transport>> {
        let transport = TcpTransport::open(endpoint, self.connect_timeout).await?;
        Ok(Arc::new(transport))
    }
}
