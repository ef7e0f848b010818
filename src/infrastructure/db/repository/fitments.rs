use tracing::error;

use super::CatalogRepository;
use crate::domain::error::{AppError, Result};
use crate::domain::fitment::Fitment;

impl CatalogRepository {
    /// Create or replace a fitment row. One import row always carries the
    /// complete pressure and dimension objects, so a conflicting write
    /// replaces them wholesale rather than merging.
    pub(crate) async fn insert_fitment(&self, fitment: &Fitment) -> Result<()> {
        let highway_pressure = serde_json::to_string(&fitment.highway_pressure)
            .map_err(|e| AppError::Internal(format!("Failed to encode highway pressure: {}", e)))?;
        let normal_pressure = serde_json::to_string(&fitment.normal_pressure)
            .map_err(|e| AppError::Internal(format!("Failed to encode normal pressure: {}", e)))?;
        let dimensions = serde_json::to_string(&fitment.dimensions)
            .map_err(|e| AppError::Internal(format!("Failed to encode dimensions: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO fitments (id, "vehicleId", "highwayPressure", "normalPressure", dimensions)
            VALUES ($1, $2, $3::jsonb, $4::jsonb, $5::jsonb)
            ON CONFLICT (id) DO UPDATE SET
                "vehicleId" = excluded."vehicleId",
                "highwayPressure" = excluded."highwayPressure",
                "normalPressure" = excluded."normalPressure",
                dimensions = excluded.dimensions
            "#,
        )
        .bind(&fitment.id)
        .bind(&fitment.vehicle_id)
        .bind(&highway_pressure)
        .bind(&normal_pressure)
        .bind(&dimensions)
        .execute(self.pool())
        .await
        .map_err(|e| {
            error!(
                fitment = %fitment.id,
                vehicle = %fitment.vehicle_id,
                "Fitment upsert failed: {}",
                e
            );
            AppError::DatabaseError(format!("Failed to upsert fitment {}: {}", fitment.id, e))
        })?;

        Ok(())
    }
}
