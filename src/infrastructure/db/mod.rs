pub mod repository;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::domain::error::{AppError, Result};

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect to Postgres: {}", e)))
}
