use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use std::sync::Arc;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::reference::DictionaryTable;
use crate::domain::vehicle::LocaleMap;
use crate::infrastructure::storage::FileStorage;

#[async_trait]
pub trait DictionaryWriter: Send + Sync {
    /// Create the entry or merge the locale values into the stored map.
    async fn upsert_dictionary_entry(
        &self,
        table: DictionaryTable,
        key: &str,
        values: &LocaleMap,
    ) -> Result<()>;
}

/// Seeds the fuel/segment/format dictionary tables from `;`-separated files
/// with a `key;lang;lang;...` header. Runs before catalog imports so row
/// mapping can resolve display values against them.
pub struct DictionaryImport {
    storage: Arc<dyn FileStorage>,
    writer: Arc<dyn DictionaryWriter>,
}

impl DictionaryImport {
    pub fn new(storage: Arc<dyn FileStorage>, writer: Arc<dyn DictionaryWriter>) -> Self {
        Self { storage, writer }
    }

    pub async fn import(
        &self,
        fuel_file: &str,
        segment_file: &str,
        format_file: &str,
    ) -> Result<()> {
        let files = [
            (DictionaryTable::Fuel, fuel_file),
            (DictionaryTable::Segment, segment_file),
            (DictionaryTable::Format, format_file),
        ];

        for (_, file) in &files {
            if !self.storage.is_file(file).await? {
                return Err(AppError::NotFound(format!(
                    "Dictionary file {} does not exist",
                    file
                )));
            }
        }

        for (table, file) in files {
            let data = self.storage.get_file(file).await?;
            let entries = parse_dictionary(&String::from_utf8_lossy(&data))?;
            for (key, values) in &entries {
                self.writer.upsert_dictionary_entry(table, key, values).await?;
            }
            info!(
                table = table.table_name(),
                file,
                entries = entries.len(),
                "Imported dictionary"
            );
        }
        Ok(())
    }
}

/// Parse a dictionary file into `(key, locale values)` rows.
pub fn parse_dictionary(content: &str) -> Result<Vec<(String, LocaleMap)>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::ParseError(format!("Failed to read dictionary headers: {}", e)))?
        .clone();
    let locales: Vec<String> = headers.iter().skip(1).map(expand_locale).collect();

    let mut entries = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::ParseError(format!(
                "Failed to parse dictionary row {}: {}",
                index + 1,
                e
            ))
        })?;
        let key = record.get(0).unwrap_or("").to_string();
        if key.is_empty() {
            continue;
        }
        let mut values = LocaleMap::new();
        for (locale, value) in locales.iter().zip(record.iter().skip(1)) {
            if !value.is_empty() {
                values.insert(locale.clone(), value.to_string());
            }
        }
        entries.push((key, values));
    }
    Ok(entries)
}

/// Dictionary headers carry short language codes: `en` maps to `en_gb`,
/// every other code doubles up (`de` → `de_de`). Full locales pass through.
fn expand_locale(code: &str) -> String {
    let code = code.trim().to_lowercase();
    if code.contains('_') {
        return code;
    }
    match code.as_str() {
        "en" => "en_gb".to_string(),
        _ => format!("{}_{}", code, code),
    }
}
