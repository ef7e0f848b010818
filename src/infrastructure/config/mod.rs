use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::PathBuf;
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::reference::MissingReferencePolicy;

/// Runtime configuration, merged from `fitment-import.toml` and
/// `FITMENT_`-prefixed environment variables (env wins). `.env` is loaded by
/// the binary before this runs.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    /// Byte size of one dispatched chunk.
    #[validate(range(min = 1))]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Look-back window for row-boundary recovery. Must exceed the longest
    /// row in the catalog export.
    #[validate(range(min = 1))]
    #[serde(default = "default_lookback_bytes")]
    pub lookback_bytes: u64,
    /// Concurrent row mappings within one chunk.
    #[validate(range(min = 1))]
    #[serde(default = "default_row_concurrency")]
    pub row_concurrency: usize,
    /// Concurrent chunk workers.
    #[validate(range(min = 1))]
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    #[validate(range(min = 1))]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub on_missing_reference: MissingReferencePolicy,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_chunk_size() -> u64 {
    102400
}

fn default_lookback_bytes() -> u64 {
    8192
}

fn default_row_concurrency() -> usize {
    8
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_max_connections() -> u32 {
    5
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file("fitment-import.toml"))
            .merge(Env::prefixed("FITMENT_"))
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Failed to load configuration: {}", e)))?;

        config
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        Ok(config)
    }
}
