use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::domain::error::{AppError, Result};

/// Result of a clamped byte-range read.
pub struct RangeRead {
    pub data: Vec<u8>,
    /// Actual file length, regardless of the requested range.
    pub total_size: u64,
}

/// Catalog file store. Range reads accept arbitrary, possibly out-of-bounds
/// end offsets and clamp them to the actual file length.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Read the inclusive byte range `[start, end]`, clamped to EOF. A start
    /// at or past EOF yields empty data together with the real total size.
    async fn read_range(&self, file_name: &str, start: u64, end: u64) -> Result<RangeRead>;

    async fn is_file(&self, file_name: &str) -> Result<bool>;

    async fn get_file(&self, file_name: &str) -> Result<Vec<u8>>;

    async fn file_size(&self, file_name: &str) -> Result<u64>;
}

/// Directory-backed storage used by the worker binary and tests. Stands in
/// for the hosted object store behind the same contract.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn read_range(&self, file_name: &str, start: u64, end: u64) -> Result<RangeRead> {
        let path = self.path_for(file_name);
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| AppError::NotFound(format!("Failed to open {}: {}", file_name, e)))?;
        let total_size = file.metadata().await?.len();

        if start >= total_size {
            return Ok(RangeRead {
                data: Vec::new(),
                total_size,
            });
        }

        let end = end.min(total_size - 1);
        let len = (end - start + 1) as usize;
        file.seek(SeekFrom::Start(start)).await?;
        let mut data = vec![0u8; len];
        file.read_exact(&mut data).await?;

        Ok(RangeRead { data, total_size })
    }

    async fn is_file(&self, file_name: &str) -> Result<bool> {
        match fs::metadata(self.path_for(file_name)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_file(&self, file_name: &str) -> Result<Vec<u8>> {
        fs::read(self.path_for(file_name))
            .await
            .map_err(|e| AppError::NotFound(format!("Failed to read {}: {}", file_name, e)))
    }

    async fn file_size(&self, file_name: &str) -> Result<u64> {
        let meta = fs::metadata(self.path_for(file_name))
            .await
            .map_err(|e| AppError::NotFound(format!("Failed to stat {}: {}", file_name, e)))?;
        Ok(meta.len())
    }
}

/// In-memory storage for unit tests.
#[cfg(test)]
pub struct MemoryStorage {
    files: std::collections::HashMap<String, Vec<u8>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: std::collections::HashMap::new(),
        }
    }

    pub fn with_file(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.to_string(), content.into());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl FileStorage for MemoryStorage {
    async fn read_range(&self, file_name: &str, start: u64, end: u64) -> Result<RangeRead> {
        let content = self
            .files
            .get(file_name)
            .ok_or_else(|| AppError::NotFound(format!("no such file: {}", file_name)))?;
        let total_size = content.len() as u64;
        if start >= total_size {
            return Ok(RangeRead {
                data: Vec::new(),
                total_size,
            });
        }
        let end = end.min(total_size - 1) as usize;
        Ok(RangeRead {
            data: content[start as usize..=end].to_vec(),
            total_size,
        })
    }

    async fn is_file(&self, file_name: &str) -> Result<bool> {
        Ok(self.files.contains_key(file_name))
    }

    async fn get_file(&self, file_name: &str) -> Result<Vec<u8>> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no such file: {}", file_name)))
    }

    async fn file_size(&self, file_name: &str) -> Result<u64> {
        Ok(self
            .files
            .get(file_name)
            .ok_or_else(|| AppError::NotFound(format!("no such file: {}", file_name)))?
            .len() as u64)
    }
}
