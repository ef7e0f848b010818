use serde::{Deserialize, Serialize};

use crate::domain::vehicle::LocaleMap;

/// Dictionary tables resolved by display value during row mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictionaryTable {
    Fuel,
    Segment,
    Format,
}

impl DictionaryTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            DictionaryTable::Fuel => "fueltypes",
            DictionaryTable::Segment => "segmenttypes",
            DictionaryTable::Format => "formattypes",
        }
    }
}

/// Model family shared by vehicles, keyed by the slug of the model name.
/// The value map accumulates one display name per locale across imports.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelType {
    pub key: String,
    pub name: LocaleMap,
}

/// What to do when a dictionary has no entry matching a row's display value
/// for the active locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReferencePolicy {
    /// Fail the record; the surrounding chunk errors and can be retried.
    Fail,
    /// Log the miss and persist a null reference.
    #[default]
    WarnAndNull,
}
