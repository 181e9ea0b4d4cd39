mod tcp;

pub use tcp::*;

use std::sync::Arc;
use url::Url;
use crate::Result;

/// Events surfaced by a transport to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Inbound text frame
    Message(String),

    /// Transport finished with the given close code
    Closed(u16),

    /// Transport-level fault; a close event follows
    Error(String),
}

/// A persistent, full-duplex, message-oriented connection.
///
/// The lifecycle manager is the only owner; everything above it talks to
/// the manager, never to a transport directly.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one text frame
    async fn send(&self, text: &str) -> Result<()>;

    /// Receive the next transport event; `None` once the event stream ends
    async fn recv(&self) -> Option<TransportEvent>;

    /// Close the transport
    async fn close(&self) -> Result<()>;
}

/// Factory for transports, one per (re)connect attempt.
#[async_trait::async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, endpoint: &Url) -> Result<Arc<dyn Transport>>;
}
