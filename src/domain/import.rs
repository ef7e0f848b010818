use serde::{Deserialize, Serialize};

/// One byte-range unit of work over a catalog file.
///
/// Offsets are inclusive. The last range of a file is not clipped to EOF;
/// readers clamp the over-read instead, so a range is fully described by the
/// dispatch-time file size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRange {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub start: u64,
    pub end: u64,
}

/// Typed view of one delimiter-separated catalog row after column mapping.
///
/// Blank source fields stay `None`/empty; the mapper decides per field what a
/// missing value means (defaulted months, dropped zero indexes and so on).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRecord {
    pub vehicle_id: String,
    pub fitment_id: String,
    pub hsntsn: String,
    pub manufacturer: String,
    pub segment: String,
    pub model: String,
    pub platform: String,
    pub start_build_year: Option<i32>,
    pub start_build_month: Option<i32>,
    pub end_build_year: Option<i32>,
    pub end_build_month: Option<i32>,
    pub fuel: String,
    pub hubraum: Option<i32>,
    pub engine_description: String,
    pub engine_size_kw: Option<i32>,
    pub format: String,
    pub normal_pressure_front: Option<f64>,
    pub highway_pressure_front: Option<f64>,
    pub normal_pressure_rear: Option<f64>,
    pub highway_pressure_rear: Option<f64>,
    pub pressure_monitoring_system: bool,
    pub front_width: Option<f64>,
    pub front_height: Option<i32>,
    pub front_rim: Option<i32>,
    pub front_load_index: String,
    pub front_speed_index: String,
    pub rear_width: Option<f64>,
    pub rear_height: Option<i32>,
    pub rear_rim: Option<i32>,
    pub rear_load_index: String,
    pub rear_speed_index: String,
    pub image_name: String,
    pub max_speed: Option<i32>,
    pub weight: Option<f64>,
    pub axle_load_front: Option<i32>,
    pub axle_load_rear: Option<i32>,
}
