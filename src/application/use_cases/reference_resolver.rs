use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::domain::reference::{DictionaryTable, MissingReferencePolicy};
use crate::shared::slug;

/// Backing store for shared reference data.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Whether the manufacturer exists under `key` with a display value for
    /// `locale`.
    async fn manufacturer_has_locale(&self, key: &str, locale: &str) -> Result<bool>;

    /// Create the manufacturer or merge the locale's display value into it.
    async fn upsert_manufacturer(
        &self,
        key: &str,
        locale: &str,
        display: &str,
        logo: &str,
    ) -> Result<()>;

    /// Find a dictionary key whose stored value for `locale` matches
    /// `display` case-insensitively.
    async fn find_dictionary_key(
        &self,
        table: DictionaryTable,
        locale: &str,
        display: &str,
    ) -> Result<Option<String>>;
}

/// Deduplicating resolver for manufacturer and dictionary keys.
///
/// One resolver is created per processed chunk and passed into the mapper.
/// Concurrent resolutions of the same `(table, locale, value)` share a single
/// in-flight cell, so at most one store round-trip runs per distinct key; the
/// cell stays in the map for the rest of the run. Cross-process consistency
/// is not needed here, the store's upserts converge on conflict.
pub struct ReferenceResolver {
    store: Arc<dyn ReferenceStore>,
    policy: MissingReferencePolicy,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Option<String>>>>>,
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn ReferenceStore>, policy: MissingReferencePolicy) -> Self {
        Self {
            store,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a manufacturer display name to its stable key, creating or
    /// merging the row when the key or the locale's value is missing.
    pub async fn resolve_manufacturer(
        &self,
        locale: &str,
        display: &str,
        logo: &str,
    ) -> Result<String> {
        let key = slug::reference_key(display);
        let cell = self
            .cell(&format!("manufacturers:{}:{}", locale, key))
            .await;

        let store = &self.store;
        let resolved = cell
            .get_or_try_init(|| async {
                if !store.manufacturer_has_locale(&key, locale).await? {
                    store.upsert_manufacturer(&key, locale, display, logo).await?;
                }
                Ok::<_, AppError>(Some(key.clone()))
            })
            .await?;

        match resolved {
            Some(resolved) => Ok(resolved.clone()),
            None => Ok(key),
        }
    }

    /// Resolve a dictionary display value to its key. A miss resolves to
    /// `None` or fails the record depending on the configured policy; misses
    /// are cached like hits so they are also looked up only once.
    pub async fn resolve_dictionary(
        &self,
        table: DictionaryTable,
        locale: &str,
        display: &str,
    ) -> Result<Option<String>> {
        let cell = self
            .cell(&format!(
                "{}:{}:{}",
                table.table_name(),
                locale,
                display.trim().to_lowercase()
            ))
            .await;

        let store = &self.store;
        let policy = self.policy;
        let resolved = cell
            .get_or_try_init(|| async {
                let found = store.find_dictionary_key(table, locale, display).await?;
                if found.is_none() {
                    match policy {
                        MissingReferencePolicy::Fail => {
                            return Err(AppError::ReferenceError(format!(
                                "No {} entry matches '{}' for locale {}",
                                table.table_name(),
                                display,
                                locale
                            )));
                        }
                        MissingReferencePolicy::WarnAndNull => {
                            let display_value = display;
                            warn!(
                                table = table.table_name(),
                                locale,
                                value = display_value,
                                "Unresolved dictionary value, keeping null reference"
                            );
                        }
                    }
                }
                Ok(found)
            })
            .await?;

        Ok(resolved.clone())
    }

    async fn cell(&self, cache_key: &str) -> Arc<OnceCell<Option<String>>> {
        let mut map = self.in_flight.lock().await;
        map.entry(cache_key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        lookups: AtomicUsize,
        writes: AtomicUsize,
        dictionary_hit: bool,
    }

    #[async_trait]
    impl ReferenceStore for CountingStore {
        async fn manufacturer_has_locale(&self, _key: &str, _locale: &str) -> Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            // Let concurrent callers pile up on the cell before finishing.
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(false)
        }

        async fn upsert_manufacturer(
            &self,
            _key: &str,
            _locale: &str,
            _display: &str,
            _logo: &str,
        ) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn find_dictionary_key(
            &self,
            _table: DictionaryTable,
            _locale: &str,
            _display: &str,
        ) -> Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.dictionary_hit.then(|| "petrol".to_string()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_coalesce_to_one_round_trip() {
        let store = Arc::new(CountingStore::default());
        let resolver = Arc::new(ReferenceResolver::new(
            store.clone(),
            MissingReferencePolicy::WarnAndNull,
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver
                    .resolve_manufacturer("de_de", "Alfa Romeo", "alfa145y")
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "alfa_romeo");
        }

        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_locales_resolve_separately() {
        let store = Arc::new(CountingStore::default());
        let resolver = ReferenceResolver::new(store.clone(), MissingReferencePolicy::WarnAndNull);

        resolver
            .resolve_manufacturer("de_de", "Alfa Romeo", "")
            .await
            .unwrap();
        resolver
            .resolve_manufacturer("en_gb", "Alfa Romeo", "")
            .await
            .unwrap();

        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dictionary_hit_resolves_key() {
        let store = Arc::new(CountingStore {
            dictionary_hit: true,
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store.clone(), MissingReferencePolicy::Fail);

        let key = resolver
            .resolve_dictionary(DictionaryTable::Fuel, "de_de", "Benzin")
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("petrol"));
    }

    #[tokio::test]
    async fn test_dictionary_miss_warns_and_resolves_null_once() {
        let store = Arc::new(CountingStore::default());
        let resolver = ReferenceResolver::new(store.clone(), MissingReferencePolicy::WarnAndNull);

        for _ in 0..3 {
            let key = resolver
                .resolve_dictionary(DictionaryTable::Segment, "de_de", "Kompaktklasse")
                .await
                .unwrap();
            assert_eq!(key, None);
        }
        // The miss is cached like a hit.
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dictionary_miss_fails_under_strict_policy() {
        let store = Arc::new(CountingStore::default());
        let resolver = ReferenceResolver::new(store, MissingReferencePolicy::Fail);

        let err = resolver
            .resolve_dictionary(DictionaryTable::Format, "de_de", "Schrägheck")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceError(_)));
    }

    #[tokio::test]
    async fn test_case_insensitive_dictionary_cache_key() {
        let store = Arc::new(CountingStore {
            dictionary_hit: true,
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store.clone(), MissingReferencePolicy::Fail);

        resolver
            .resolve_dictionary(DictionaryTable::Fuel, "de_de", "Benzin")
            .await
            .unwrap();
        resolver
            .resolve_dictionary(DictionaryTable::Fuel, "de_de", "BENZIN")
            .await
            .unwrap();

        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }
}
