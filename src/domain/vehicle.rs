use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locale code (`de_de`, `en_gb`, ...) to display text.
pub type LocaleMap = BTreeMap<String, String>;

/// Type-approval code pair identifying a vehicle variant exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsnTsn {
    pub hsn: String,
    pub tsn: String,
}

impl HsnTsn {
    /// Wire form used by the `text[]` vehicle column.
    pub fn to_column_value(&self) -> String {
        format!("{},{}", self.hsn, self.tsn)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxleLoad {
    pub front: Option<i32>,
    pub rear: Option<i32>,
}

/// A catalog vehicle. Created on first import, merged on every later one:
/// `countries` only grows, locale maps accumulate per locale, scalars take the
/// latest import's values.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: String,
    pub hsntsn: Vec<HsnTsn>,
    /// Model-family slug, foreign key into the model-type table.
    pub code: String,
    pub countries: Vec<String>,
    pub tpms: bool,
    pub manufacturer: String,
    pub platform: String,
    pub start_build_year: Option<i32>,
    pub start_build_month: Option<i32>,
    pub end_build_year: Option<i32>,
    pub end_build_month: Option<i32>,
    pub segment_id: Option<String>,
    pub fuel_id: Option<String>,
    pub volume: Option<i32>,
    pub engine_description: LocaleMap,
    pub engine_size_kw: Option<i32>,
    pub engine_size_ps: Option<i32>,
    pub format_id: Option<String>,
    pub max_speed: Option<i32>,
    pub weight: Option<f64>,
    pub axle_load: AxleLoad,
    /// Localized model display name; persisted as a model-type value, not a
    /// vehicle column.
    pub model_name: String,
}
