use tracing::error;

use super::CatalogRepository;
use crate::domain::error::{AppError, Result};
use crate::domain::vehicle::Vehicle;

impl CatalogRepository {
    /// Create or merge a vehicle row. Countries accumulate as a distinct
    /// set, the engine description merges per locale, everything else takes
    /// the incoming import's values.
    pub(crate) async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        let hsntsn: Vec<String> = vehicle
            .hsntsn
            .iter()
            .map(|pair| pair.to_column_value())
            .collect();
        let engine_description = serde_json::to_string(&vehicle.engine_description)
            .map_err(|e| AppError::Internal(format!("Failed to encode engine description: {}", e)))?;
        let axle_load = serde_json::to_string(&vehicle.axle_load)
            .map_err(|e| AppError::Internal(format!("Failed to encode axle load: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO vehicles
                (id, hsntsn, code, countries, tpms, manufacturer, platform,
                 "startBuildYear", "startBuildMonth", "endBuildYear", "endBuildMonth",
                 "segmentId", "fuelId", volume, "engineDescription",
                 "engineSizeKw", "engineSizePs", "formatId", "maxSpeed", weight, "axleLoad")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15::jsonb, $16, $17, $18, $19, $20::float8, $21::jsonb)
            ON CONFLICT (id) DO UPDATE SET
                hsntsn = excluded.hsntsn,
                code = excluded.code,
                countries = (
                    SELECT array_agg(DISTINCT c) FROM unnest(vehicles.countries || excluded.countries) AS c
                ),
                tpms = excluded.tpms,
                manufacturer = excluded.manufacturer,
                platform = excluded.platform,
                "startBuildYear" = excluded."startBuildYear",
                "startBuildMonth" = excluded."startBuildMonth",
                "endBuildYear" = excluded."endBuildYear",
                "endBuildMonth" = excluded."endBuildMonth",
                "segmentId" = excluded."segmentId",
                "fuelId" = excluded."fuelId",
                volume = excluded.volume,
                "engineDescription" = vehicles."engineDescription" || excluded."engineDescription",
                "engineSizeKw" = excluded."engineSizeKw",
                "engineSizePs" = excluded."engineSizePs",
                "formatId" = excluded."formatId",
                "maxSpeed" = excluded."maxSpeed",
                weight = excluded.weight,
                "axleLoad" = excluded."axleLoad"
            "#,
        )
        .bind(&vehicle.id)
        .bind(&hsntsn)
        .bind(&vehicle.code)
        .bind(&vehicle.countries)
        .bind(vehicle.tpms)
        .bind(&vehicle.manufacturer)
        .bind(&vehicle.platform)
        .bind(vehicle.start_build_year)
        .bind(vehicle.start_build_month)
        .bind(vehicle.end_build_year)
        .bind(vehicle.end_build_month)
        .bind(&vehicle.segment_id)
        .bind(&vehicle.fuel_id)
        .bind(vehicle.volume)
        .bind(&engine_description)
        .bind(vehicle.engine_size_kw)
        .bind(vehicle.engine_size_ps)
        .bind(&vehicle.format_id)
        .bind(vehicle.max_speed)
        .bind(vehicle.weight)
        .bind(&axle_load)
        .execute(self.pool())
        .await
        .map_err(|e| {
            error!(vehicle = %vehicle.id, "Vehicle upsert failed: {}", e);
            AppError::DatabaseError(format!("Failed to upsert vehicle {}: {}", vehicle.id, e))
        })?;

        Ok(())
    }

    /// Delete every vehicle no fitment references anymore. The source
    /// catalog retracts a vehicle by dropping its fitment rows.
    pub(crate) async fn remove_orphan_vehicles(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM vehicles v
            WHERE NOT EXISTS (
                SELECT 1 FROM fitments f WHERE f."vehicleId" = v.id
            )
            "#,
        )
        .execute(self.pool())
        .await
        .map_err(|e| {
            error!("Orphan vehicle cleanup failed: {}", e);
            AppError::DatabaseError(format!("Failed to clean up orphan vehicles: {}", e))
        })?;

        Ok(result.rows_affected())
    }
}
