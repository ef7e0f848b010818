use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use super::CatalogRepository;
use crate::application::use_cases::dictionary_import::DictionaryWriter;
use crate::application::use_cases::reference_resolver::ReferenceStore;
use crate::domain::error::{AppError, Result};
use crate::domain::reference::{DictionaryTable, ModelType};
use crate::domain::vehicle::LocaleMap;

impl CatalogRepository {
    pub(crate) async fn insert_model_type(&self, model: &ModelType) -> Result<()> {
        let value = serde_json::to_string(&model.name)
            .map_err(|e| AppError::Internal(format!("Failed to encode model name: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO modeltypes (key, value)
            VALUES ($1, $2::jsonb)
            ON CONFLICT (key) DO UPDATE SET
                value = modeltypes.value || excluded.value
            "#,
        )
        .bind(&model.key)
        .bind(&value)
        .execute(self.pool())
        .await
        .map_err(|e| {
            error!(model = %model.key, "Model type upsert failed: {}", e);
            AppError::DatabaseError(format!("Failed to upsert model type {}: {}", model.key, e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl ReferenceStore for CatalogRepository {
    async fn manufacturer_has_locale(&self, key: &str, locale: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT key FROM manufacturers WHERE key = $1 AND jsonb_exists(name, $2)",
        )
        .bind(key)
        .bind(locale)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to look up manufacturer {}: {}", key, e))
        })?;

        Ok(row.is_some())
    }

    async fn upsert_manufacturer(
        &self,
        key: &str,
        locale: &str,
        display: &str,
        logo: &str,
    ) -> Result<()> {
        let name = json!({ locale: display }).to_string();

        sqlx::query(
            r#"
            INSERT INTO manufacturers (key, name, logo)
            VALUES ($1, $2::jsonb, $3)
            ON CONFLICT (key) DO UPDATE SET
                name = manufacturers.name || excluded.name,
                logo = excluded.logo
            "#,
        )
        .bind(key)
        .bind(&name)
        .bind(logo)
        .execute(self.pool())
        .await
        .map_err(|e| {
            error!(manufacturer = key, "Manufacturer upsert failed: {}", e);
            AppError::DatabaseError(format!("Failed to upsert manufacturer {}: {}", key, e))
        })?;

        Ok(())
    }

    async fn find_dictionary_key(
        &self,
        table: DictionaryTable,
        locale: &str,
        display: &str,
    ) -> Result<Option<String>> {
        let query = format!(
            "SELECT key FROM {} WHERE lower(value->>$1) = lower($2)",
            table.table_name()
        );
        let row: Option<(String,)> = sqlx::query_as(&query)
            .bind(locale)
            .bind(display)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to look up {} value '{}': {}",
                    table.table_name(),
                    display,
                    e
                ))
            })?;

        Ok(row.map(|(key,)| key))
    }
}

#[async_trait]
impl DictionaryWriter for CatalogRepository {
    async fn upsert_dictionary_entry(
        &self,
        table: DictionaryTable,
        key: &str,
        values: &LocaleMap,
    ) -> Result<()> {
        let value = serde_json::to_string(values)
            .map_err(|e| AppError::Internal(format!("Failed to encode dictionary value: {}", e)))?;
        let query = format!(
            r#"
            INSERT INTO {table} (key, value)
            VALUES ($1, $2::jsonb)
            ON CONFLICT (key) DO UPDATE SET
                value = {table}.value || excluded.value
            "#,
            table = table.table_name()
        );

        sqlx::query(&query)
            .bind(key)
            .bind(&value)
            .execute(self.pool())
            .await
            .map_err(|e| {
                error!(table = table.table_name(), key, "Dictionary upsert failed: {}", e);
                AppError::DatabaseError(format!(
                    "Failed to upsert {} entry {}: {}",
                    table.table_name(),
                    key,
                    e
                ))
            })?;

        Ok(())
    }
}
