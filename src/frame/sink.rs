use std::sync::Arc;
use tokio::sync::RwLock;

use crate::frame::FramePayload;
use crate::Result;

/// Consumer contract for decoded frames.
///
/// Implementations draw the image on whatever surface they own. A render
/// error is a per-frame problem; the session keeps playing and the prior
/// frame stays displayed.
#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    async fn render(&self, frame: &FramePayload) -> Result<()>;
}

/// Sink that discards frames; useful when only status is of interest
pub struct NullSink;

#[async_trait::async_trait]
impl FrameSink for NullSink {
    async fn render(&self, _frame: &FramePayload) -> Result<()> {
        Ok(())
    }
}

/// Sink that buffers every rendered frame in memory
pub struct BufferSink {
    frames: Arc<RwLock<Vec<FramePayload>>>,
}

impl BufferSink {
    /// Create an empty buffer sink
    pub fn new() -> Self {
        BufferSink {
            frames: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of frames rendered so far
    pub async fn len(&self) -> usize {
        self.frames.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.frames.read().await.is_empty()
    }

    /// Snapshot of all rendered frames
    pub async fn frames(&self) -> Vec<FramePayload> {
        self.frames.read().await.clone()
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        BufferSink::new()
    }
}

#[async_trait::async_trait]
impl FrameSink for BufferSink {
    async fn render(&self, frame: &FramePayload) -> Result<()> {
        self.frames.write().await.push(frame.clone());
        Ok(())
    }
}
