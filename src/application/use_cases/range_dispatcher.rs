use std::sync::Arc;
use tracing::info;

use crate::domain::error::Result;
use crate::domain::import::FileRange;
use crate::infrastructure::queue::ImportQueue;

/// Splits an uploaded catalog file into fixed-size byte ranges and hands each
/// one to the queue as an independent unit of work.
///
/// Ranges may be delivered out of order and concurrently; nothing downstream
/// relies on ordering between them. The final range deliberately over-reads
/// past EOF, readers clamp it.
pub struct RangeDispatcher {
    queue: Arc<dyn ImportQueue>,
    chunk_size: u64,
}

impl RangeDispatcher {
    pub fn new(queue: Arc<dyn ImportQueue>, chunk_size: u64) -> Self {
        Self { queue, chunk_size }
    }

    pub fn plan(&self, file_name: &str, total_size: u64) -> Vec<FileRange> {
        let chunks = total_size.div_ceil(self.chunk_size);
        (0..chunks)
            .map(|i| {
                let start = i * self.chunk_size;
                FileRange {
                    file_name: file_name.to_string(),
                    start,
                    end: start + self.chunk_size - 1,
                }
            })
            .collect()
    }

    pub async fn dispatch(&self, file_name: &str, total_size: u64) -> Result<usize> {
        let ranges = self.plan(file_name, total_size);
        for range in &ranges {
            self.queue.enqueue(range).await?;
        }
        info!(
            file = file_name,
            size = total_size,
            chunks = ranges.len(),
            "Dispatched file ranges"
        );
        Ok(ranges.len())
    }
}
