use std::sync::Arc;
use tracing::debug;

use crate::domain::error::Result;
use crate::domain::import::FileRange;
use crate::infrastructure::storage::FileStorage;

const ROW_TERMINATOR: u8 = b'\n';

/// Turns one byte range of a catalog file into the complete rows it owns.
///
/// Row boundaries are unknown at dispatch time, so a range usually starts and
/// ends mid-row. A chunk owns every row whose terminator falls inside its
/// range (plus the file's final row once the read reaches EOF): the trailing
/// cut row is dropped, and a bounded look-back re-read recovers the head of
/// the row cut at `start`. Ranges stay stateless and individually retryable,
/// at the cost of one extra small read per chunk.
///
/// Boundary work happens on raw bytes; rows are decoded only once they are
/// whole, so a chunk border inside a multi-byte character cannot corrupt
/// text.
pub struct ChunkNormalizer {
    storage: Arc<dyn FileStorage>,
    /// Look-back window size. Must comfortably exceed the longest row.
    lookback: u64,
}

impl ChunkNormalizer {
    pub fn new(storage: Arc<dyn FileStorage>, lookback: u64) -> Self {
        Self { storage, lookback }
    }

    pub async fn normalize(&self, range: &FileRange) -> Result<Vec<String>> {
        let read = self
            .storage
            .read_range(&range.file_name, range.start, range.end)
            .await?;

        // Every row of the file was settled by earlier ranges.
        if range.start >= read.total_size {
            debug!(
                file = %range.file_name,
                start = range.start,
                "Range starts past EOF, nothing to emit"
            );
            return Ok(Vec::new());
        }

        let mut block = read.data;

        if range.start > 0 {
            let head = self.recover_row_head(range).await?;
            if !head.is_empty() {
                let mut assembled = head;
                assembled.extend_from_slice(&block);
                block = assembled;
            }
        }

        let reached_eof = range.end + 1 >= read.total_size;
        let mut segments: Vec<&[u8]> = block.split(|&b| b == ROW_TERMINATOR).collect();
        if !reached_eof && block.last() != Some(&ROW_TERMINATOR) {
            // Incomplete trailing row, owned by the range holding its
            // terminator. At EOF the file end terminates it instead.
            segments.pop();
        }

        let rows = segments
            .into_iter()
            .map(decode_row)
            .filter(|row| !row.is_empty())
            .collect();

        Ok(rows)
    }

    /// Re-read the window just before `start` and return the partial row the
    /// chunk border cut off, i.e. everything after the window's last
    /// terminator. A window without a terminator is returned whole. When the
    /// border sits exactly on a row boundary the window ends with the
    /// terminator and the recovered head is empty.
    async fn recover_row_head(&self, range: &FileRange) -> Result<Vec<u8>> {
        let lb_start = range.start.saturating_sub(self.lookback);
        let lb_end = range.start - 1;
        let lb = self
            .storage
            .read_range(&range.file_name, lb_start, lb_end)
            .await?;

        let head = match lb.data.iter().rposition(|&b| b == ROW_TERMINATOR) {
            Some(pos) => lb.data[pos + 1..].to_vec(),
            None => lb.data,
        };
        Ok(head)
    }
}

/// Decode one reassembled row: strip the CR of CRLF input, then UTF-8 with a
/// Windows-1252 fallback for legacy exports.
fn decode_row(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}
