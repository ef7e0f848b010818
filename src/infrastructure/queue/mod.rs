use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::error::{AppError, Result};
use crate::domain::import::FileRange;

/// Work queue for chunk ranges. Delivery is at-least-once; consumers must
/// process each range independently and idempotently.
#[async_trait]
pub trait ImportQueue: Send + Sync {
    async fn enqueue(&self, range: &FileRange) -> Result<()>;
}

/// In-process queue backed by an unbounded channel. Stands in for the hosted
/// queue when dispatch and workers run in the same process.
pub struct ChannelQueue {
    tx: mpsc::UnboundedSender<FileRange>,
}

impl ChannelQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FileRange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ImportQueue for ChannelQueue {
    async fn enqueue(&self, range: &FileRange) -> Result<()> {
        self.tx
            .send(range.clone())
            .map_err(|e| AppError::QueueError(format!("Failed to enqueue range: {}", e)))
    }
}
