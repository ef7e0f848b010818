mod fitments;
mod references;
mod vehicles;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::application::use_cases::import_pipeline::CatalogWriter;
use crate::domain::error::Result;
use crate::domain::fitment::Fitment;
use crate::domain::reference::ModelType;
use crate::domain::vehicle::Vehicle;

/// Postgres-backed persistence for the catalog. All writes are upserts whose
/// conflict clauses encode the merge semantics (set-union for countries,
/// locale-map merge for JSON values, overwrite for the rest), so redelivered
/// chunks converge instead of corrupting state.
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = crate::infrastructure::db::connect(database_url, max_connections).await?;
        Ok(Self::new(pool))
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogWriter for CatalogRepository {
    async fn upsert_model_type(&self, model: &ModelType) -> Result<()> {
        self.insert_model_type(model).await
    }

    async fn upsert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        self.insert_vehicle(vehicle).await
    }

    async fn upsert_fitment(&self, fitment: &Fitment) -> Result<()> {
        self.insert_fitment(fitment).await
    }

    async fn delete_orphan_vehicles(&self) -> Result<u64> {
        self.remove_orphan_vehicles().await
    }
}
