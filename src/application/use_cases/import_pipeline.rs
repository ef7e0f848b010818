use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::use_cases::chunk_normalizer::ChunkNormalizer;
use crate::application::use_cases::dedup;
use crate::application::use_cases::reference_resolver::{ReferenceResolver, ReferenceStore};
use crate::application::use_cases::row_mapper::{MappedRow, RowMapper};
use crate::domain::error::{AppError, Result};
use crate::domain::fitment::Fitment;
use crate::domain::import::FileRange;
use crate::domain::reference::{MissingReferencePolicy, ModelType};
use crate::domain::vehicle::{LocaleMap, Vehicle};
use crate::infrastructure::storage::FileStorage;

/// Persistence port for the import pipeline. Every operation is an
/// idempotent upsert; replaying a chunk converges to the same state.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn upsert_model_type(&self, model: &ModelType) -> Result<()>;
    async fn upsert_vehicle(&self, vehicle: &Vehicle) -> Result<()>;
    async fn upsert_fitment(&self, fitment: &Fitment) -> Result<()>;
    /// Remove vehicles no fitment points at anymore. Returns how many went.
    async fn delete_orphan_vehicles(&self) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct ImportPipelineConfig {
    pub lookback_bytes: u64,
    pub row_concurrency: usize,
    pub on_missing_reference: MissingReferencePolicy,
}

impl Default for ImportPipelineConfig {
    fn default() -> Self {
        Self {
            lookback_bytes: 8192,
            row_concurrency: 8,
            on_missing_reference: MissingReferencePolicy::default(),
        }
    }
}

/// What one processed chunk did, for structured logging.
#[derive(Debug, Default)]
pub struct ChunkReport {
    pub rows: usize,
    pub skipped: usize,
    pub vehicles: usize,
    pub fitments: usize,
    pub orphans_removed: u64,
}

/// Runs one queue delivery end to end: normalize the byte range, map rows
/// with bounded concurrency, dedup, then commit in the fixed order model
/// rows → vehicles → fitments → orphan cleanup. The order is load-bearing:
/// fitment upserts assume their vehicle row exists, and cleanup assumes the
/// batch's fitments are already written.
pub struct ImportPipeline {
    normalizer: ChunkNormalizer,
    references: Arc<dyn ReferenceStore>,
    writer: Arc<dyn CatalogWriter>,
    config: ImportPipelineConfig,
}

impl ImportPipeline {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        references: Arc<dyn ReferenceStore>,
        writer: Arc<dyn CatalogWriter>,
        config: ImportPipelineConfig,
    ) -> Self {
        Self {
            normalizer: ChunkNormalizer::new(storage, config.lookback_bytes),
            references,
            writer,
            config,
        }
    }

    pub async fn process_chunk(&self, range: &FileRange) -> Result<ChunkReport> {
        let job = Uuid::new_v4();
        let locale = locale_from_file_name(&range.file_name);

        let rows = self.normalizer.normalize(range).await?;
        info!(
            %job,
            file = %range.file_name,
            start = range.start,
            end = range.end,
            locale = %locale,
            rows = rows.len(),
            "Processing chunk"
        );

        let total_rows = rows.len();
        let (mapped, skipped) = self.map_rows(&locale, rows).await?;
        let partition = dedup::partition(mapped);

        for row in &partition.unique {
            let model = ModelType {
                key: row.vehicle.code.clone(),
                name: single_locale(&locale, &row.vehicle.model_name),
            };
            self.writer.upsert_model_type(&model).await?;
        }
        for row in &partition.unique {
            self.writer.upsert_vehicle(&row.vehicle).await?;
        }
        let mut fitments = 0;
        for row in partition.unique.iter().chain(&partition.duplicated) {
            self.writer.upsert_fitment(&row.fitment).await?;
            fitments += 1;
        }
        let orphans_removed = self.writer.delete_orphan_vehicles().await?;

        let report = ChunkReport {
            rows: total_rows,
            skipped,
            vehicles: partition.unique.len(),
            fitments,
            orphans_removed,
        };
        info!(
            %job,
            vehicles = report.vehicles,
            fitments = report.fitments,
            skipped = report.skipped,
            orphans_removed = report.orphans_removed,
            "Chunk committed"
        );
        Ok(report)
    }

    /// Map normalized rows into domain records with bounded concurrency.
    /// The per-chunk resolver coalesces duplicate reference lookups across
    /// the in-flight rows. Structurally malformed rows are logged and
    /// skipped; every other error fails the chunk so the queue can redeliver
    /// it.
    async fn map_rows(&self, locale: &str, rows: Vec<String>) -> Result<(Vec<MappedRow>, usize)> {
        let resolver = Arc::new(ReferenceResolver::new(
            self.references.clone(),
            self.config.on_missing_reference,
        ));
        let mapper = Arc::new(RowMapper::new(locale, resolver));

        let mut set: JoinSet<(usize, Result<MappedRow>)> = JoinSet::new();
        let mut outcomes = Vec::with_capacity(rows.len());
        for (idx, line) in rows.into_iter().enumerate() {
            while set.len() >= self.config.row_concurrency {
                if let Some(joined) = set.join_next().await {
                    outcomes.push(join_outcome(joined)?);
                }
            }
            let mapper = mapper.clone();
            set.spawn(async move { (idx, mapper.map_row(&line).await) });
        }
        while let Some(joined) = set.join_next().await {
            outcomes.push(join_outcome(joined)?);
        }

        // Dedup relies on batch order; tasks finish out of order.
        outcomes.sort_by_key(|(idx, _)| *idx);

        let mut mapped = Vec::new();
        let mut skipped = 0;
        for (idx, outcome) in outcomes {
            match outcome {
                Ok(row) => mapped.push(row),
                Err(AppError::ParseError(msg)) => {
                    skipped += 1;
                    warn!(row = idx, "Skipping unprocessable row: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((mapped, skipped))
    }
}

fn join_outcome(
    joined: std::result::Result<(usize, Result<MappedRow>), tokio::task::JoinError>,
) -> Result<(usize, Result<MappedRow>)> {
    joined.map_err(|e| AppError::Internal(format!("Row mapping task failed: {}", e)))
}

fn single_locale(locale: &str, value: &str) -> LocaleMap {
    let mut map = LocaleMap::new();
    if !value.is_empty() {
        map.insert(locale.to_string(), value.to_string());
    }
    map
}

/// `import/GDY_DE_DE.csv` → `de_de`. The locale rides on the file name, one
/// upload per locale.
pub fn locale_from_file_name(file_name: &str) -> String {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = base.split('.').next().unwrap_or(base);
    stem.replace("GDY_", "").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::row_schema::FIXTURE_ROW;
    use crate::domain::reference::DictionaryTable;
    use crate::infrastructure::storage::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct CatalogState {
        manufacturers: HashMap<String, LocaleMap>,
        dictionaries: HashMap<&'static str, HashMap<String, LocaleMap>>,
        models: HashMap<String, LocaleMap>,
        vehicles: HashMap<String, Vehicle>,
        fitments: HashMap<String, Fitment>,
    }

    /// In-memory catalog with the same merge-on-conflict semantics the SQL
    /// upserts have.
    #[derive(Default)]
    struct MemoryCatalog {
        state: Mutex<CatalogState>,
    }

    impl MemoryCatalog {
        fn with_dictionaries(locales: &[&str]) -> Self {
            let catalog = Self::default();
            {
                let mut state = catalog.state.lock().unwrap();
                for (table, key, value) in [
                    ("fueltypes", "petrol", "Benzyna"),
                    ("segmenttypes", "small_family_car", "Auto segmentu C"),
                    ("formattypes", "hatchback", "Hatchback"),
                ] {
                    let mut values = LocaleMap::new();
                    for locale in locales {
                        values.insert(locale.to_string(), value.to_string());
                    }
                    state
                        .dictionaries
                        .entry(table)
                        .or_default()
                        .insert(key.to_string(), values);
                }
            }
            catalog
        }

        fn snapshot(&self) -> CatalogState {
            self.state.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReferenceStore for MemoryCatalog {
        async fn manufacturer_has_locale(&self, key: &str, locale: &str) -> Result<bool> {
            let state = self.state.lock().unwrap();
            Ok(state
                .manufacturers
                .get(key)
                .is_some_and(|name| name.contains_key(locale)))
        }

        async fn upsert_manufacturer(
            &self,
            key: &str,
            locale: &str,
            display: &str,
            _logo: &str,
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state
                .manufacturers
                .entry(key.to_string())
                .or_default()
                .insert(locale.to_string(), display.to_string());
            Ok(())
        }

        async fn find_dictionary_key(
            &self,
            table: DictionaryTable,
            locale: &str,
            display: &str,
        ) -> Result<Option<String>> {
            let state = self.state.lock().unwrap();
            let entries = match state.dictionaries.get(table.table_name()) {
                Some(entries) => entries,
                None => return Ok(None),
            };
            Ok(entries
                .iter()
                .find(|(_, values)| {
                    values
                        .get(locale)
                        .is_some_and(|v| v.eq_ignore_ascii_case(display))
                })
                .map(|(key, _)| key.clone()))
        }
    }

    #[async_trait]
    impl CatalogWriter for MemoryCatalog {
        async fn upsert_model_type(&self, model: &ModelType) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state
                .models
                .entry(model.key.clone())
                .or_default()
                .extend(model.name.clone());
            Ok(())
        }

        async fn upsert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            match state.vehicles.get_mut(&vehicle.id) {
                Some(existing) => {
                    // countries union, locale maps merge, scalars overwrite.
                    let mut countries = existing.countries.clone();
                    for country in &vehicle.countries {
                        if !countries.contains(country) {
                            countries.push(country.clone());
                        }
                    }
                    let mut engine_description = existing.engine_description.clone();
                    engine_description.extend(vehicle.engine_description.clone());

                    *existing = vehicle.clone();
                    existing.countries = countries;
                    existing.engine_description = engine_description;
                }
                None => {
                    state.vehicles.insert(vehicle.id.clone(), vehicle.clone());
                }
            }
            Ok(())
        }

        async fn upsert_fitment(&self, fitment: &Fitment) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if !state.vehicles.contains_key(&fitment.vehicle_id) {
                return Err(AppError::DatabaseError(format!(
                    "fitment {} references missing vehicle {}",
                    fitment.id, fitment.vehicle_id
                )));
            }
            state.fitments.insert(fitment.id.clone(), fitment.clone());
            Ok(())
        }

        async fn delete_orphan_vehicles(&self) -> Result<u64> {
            let mut state = self.state.lock().unwrap();
            let referenced: std::collections::HashSet<String> = state
                .fitments
                .values()
                .map(|f| f.vehicle_id.clone())
                .collect();
            let before = state.vehicles.len();
            state.vehicles.retain(|id, _| referenced.contains(id));
            Ok((before - state.vehicles.len()) as u64)
        }
    }

    fn fixture_rows() -> (String, String, String) {
        let a_f1 = FIXTURE_ROW.to_string();
        let a_f2 = FIXTURE_ROW.replace("00354000001600354", "00354000001600999");
        let b_f3 = FIXTURE_ROW
            .replace("P00000100000016", "P00000100000099")
            .replace("00354000001600354", "00354000001600777");
        (a_f1, a_f2, b_f3)
    }

    fn pipeline(
        content: &str,
        catalog: Arc<MemoryCatalog>,
        policy: MissingReferencePolicy,
    ) -> ImportPipeline {
        let storage = Arc::new(MemoryStorage::new().with_file("GDY_DE_DE.csv", content.as_bytes().to_vec()));
        ImportPipeline::new(
            storage,
            catalog.clone(),
            catalog,
            ImportPipelineConfig {
                lookback_bytes: 8192,
                row_concurrency: 4,
                on_missing_reference: policy,
            },
        )
    }

    fn whole_file_range(content: &str) -> FileRange {
        FileRange {
            file_name: "GDY_DE_DE.csv".to_string(),
            start: 0,
            end: content.len() as u64 + 100,
        }
    }

    #[tokio::test]
    async fn test_chunk_import_writes_vehicles_and_all_fitments() {
        let (a_f1, a_f2, b_f3) = fixture_rows();
        let content = format!("{}\n{}\n{}\n", a_f1, a_f2, b_f3);
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de"]));
        let pipeline = pipeline(&content, catalog.clone(), MissingReferencePolicy::WarnAndNull);

        let report = pipeline
            .process_chunk(&whole_file_range(&content))
            .await
            .unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.vehicles, 2);
        assert_eq!(report.fitments, 3);

        let state = catalog.snapshot();
        assert_eq!(state.vehicles.len(), 2);
        assert_eq!(state.fitments.len(), 3);
        assert_eq!(state.manufacturers.len(), 1);
        assert!(state.models.contains_key("alfa-145_146"));
        let vehicle = &state.vehicles["P00000100000016"];
        assert_eq!(vehicle.fuel_id.as_deref(), Some("petrol"));
        assert_eq!(vehicle.countries, vec!["de"]);
    }

    #[tokio::test]
    async fn test_processing_the_same_chunk_twice_is_idempotent() {
        let (a_f1, a_f2, _) = fixture_rows();
        let content = format!("{}\n{}\n", a_f1, a_f2);
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de"]));
        let pipeline = pipeline(&content, catalog.clone(), MissingReferencePolicy::WarnAndNull);
        let range = whole_file_range(&content);

        pipeline.process_chunk(&range).await.unwrap();
        let first = catalog.snapshot();
        pipeline.process_chunk(&range).await.unwrap();
        assert_eq!(catalog.snapshot(), first);
    }

    #[tokio::test]
    async fn test_chunked_processing_in_any_order_imports_every_row() {
        let (a_f1, a_f2, b_f3) = fixture_rows();
        let content = format!("{}\n{}\n{}\n", a_f1, a_f2, b_f3);
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de"]));
        let pipeline = pipeline(&content, catalog.clone(), MissingReferencePolicy::WarnAndNull);

        // Uneven chunk size, processed back to front.
        let chunk_size = 150u64;
        let chunks = (content.len() as u64).div_ceil(chunk_size);
        for i in (0..chunks).rev() {
            let start = i * chunk_size;
            let range = FileRange {
                file_name: "GDY_DE_DE.csv".to_string(),
                start,
                end: start + chunk_size - 1,
            };
            pipeline.process_chunk(&range).await.unwrap();
        }

        let state = catalog.snapshot();
        assert_eq!(state.vehicles.len(), 2);
        assert_eq!(state.fitments.len(), 3);
    }

    #[tokio::test]
    async fn test_second_locale_merges_countries_and_locale_maps() {
        let (a_f1, _, _) = fixture_rows();
        let content = format!("{}\n", a_f1);
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de", "pl_pl"]));

        let de = pipeline(&content, catalog.clone(), MissingReferencePolicy::WarnAndNull);
        de.process_chunk(&whole_file_range(&content)).await.unwrap();

        let storage = Arc::new(
            MemoryStorage::new().with_file("GDY_PL_PL.csv", content.as_bytes().to_vec()),
        );
        let pl = ImportPipeline::new(
            storage,
            catalog.clone(),
            catalog.clone(),
            ImportPipelineConfig::default(),
        );
        pl.process_chunk(&FileRange {
            file_name: "GDY_PL_PL.csv".to_string(),
            start: 0,
            end: content.len() as u64 + 100,
        })
        .await
        .unwrap();

        let state = catalog.snapshot();
        let vehicle = &state.vehicles["P00000100000016"];
        assert_eq!(vehicle.countries, vec!["de", "pl"]);
        assert!(vehicle.engine_description.contains_key("de_de"));
        assert!(vehicle.engine_description.contains_key("pl_pl"));
        let manufacturer = &state.manufacturers["alfa_romeo"];
        assert!(manufacturer.contains_key("de_de"));
        assert!(manufacturer.contains_key("pl_pl"));
        let model = &state.models["alfa-145_146"];
        assert_eq!(model.get("pl_pl").map(String::as_str), Some("Alfa 145/146"));
    }

    #[tokio::test]
    async fn test_orphaned_vehicles_are_cleaned_up() {
        let (a_f1, _, _) = fixture_rows();
        let content = format!("{}\n", a_f1);
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de"]));
        {
            // A vehicle left behind by an earlier import, with no fitments.
            let mut state = catalog.state.lock().unwrap();
            let orphan = Vehicle {
                id: "ORPHAN".to_string(),
                hsntsn: Vec::new(),
                code: "orphan".to_string(),
                countries: vec!["de".to_string()],
                tpms: false,
                manufacturer: "alfa_romeo".to_string(),
                platform: String::new(),
                start_build_year: None,
                start_build_month: Some(1),
                end_build_year: None,
                end_build_month: Some(12),
                segment_id: None,
                fuel_id: None,
                volume: None,
                engine_description: LocaleMap::new(),
                engine_size_kw: None,
                engine_size_ps: None,
                format_id: None,
                max_speed: None,
                weight: None,
                axle_load: crate::domain::vehicle::AxleLoad { front: None, rear: None },
                model_name: String::new(),
            };
            state.vehicles.insert(orphan.id.clone(), orphan);
        }
        let pipeline = pipeline(&content, catalog.clone(), MissingReferencePolicy::WarnAndNull);

        let report = pipeline
            .process_chunk(&whole_file_range(&content))
            .await
            .unwrap();

        assert_eq!(report.orphans_removed, 1);
        let state = catalog.snapshot();
        assert!(!state.vehicles.contains_key("ORPHAN"));
        for vehicle_id in state.vehicles.keys() {
            assert!(state
                .fitments
                .values()
                .any(|f| &f.vehicle_id == vehicle_id));
        }
    }

    #[tokio::test]
    async fn test_malformed_row_is_skipped_and_surfaced() {
        let (a_f1, _, b_f3) = fixture_rows();
        let content = format!("{}\nnot;a;catalog;row\n{}\n", a_f1, b_f3);
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de"]));
        let pipeline = pipeline(&content, catalog.clone(), MissingReferencePolicy::WarnAndNull);

        let report = pipeline
            .process_chunk(&whole_file_range(&content))
            .await
            .unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(catalog.snapshot().vehicles.len(), 2);
    }

    #[tokio::test]
    async fn test_strict_policy_fails_the_chunk_on_dictionary_miss() {
        let (a_f1, _, _) = fixture_rows();
        let content = format!("{}\n", a_f1.replace(";Benzyna;", ";Wasserstoff;"));
        let catalog = Arc::new(MemoryCatalog::with_dictionaries(&["de_de"]));
        let pipeline = pipeline(&content, catalog.clone(), MissingReferencePolicy::Fail);

        let err = pipeline
            .process_chunk(&whole_file_range(&content))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceError(_)));
    }

    #[test]
    fn test_locale_from_file_name() {
        assert_eq!(locale_from_file_name("GDY_DE_DE.csv"), "de_de");
        assert_eq!(locale_from_file_name("import/GDY_PL_PL.csv"), "pl_pl");
        assert_eq!(locale_from_file_name("EN_GB.csv"), "en_gb");
    }
}
