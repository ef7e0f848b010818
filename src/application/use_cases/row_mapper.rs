use std::sync::Arc;

use crate::application::use_cases::reference_resolver::ReferenceResolver;
use crate::application::use_cases::row_schema;
use crate::domain::error::{AppError, Result};
use crate::domain::fitment::{AxlePressure, Dimension, Dimensions, Fitment};
use crate::domain::import::ImportRecord;
use crate::domain::reference::DictionaryTable;
use crate::domain::vehicle::{AxleLoad, HsnTsn, LocaleMap, Vehicle};
use crate::shared::slug;

const KW_TO_PS: f64 = 1.35962;
/// Widths below this can only be inch measures; everything else is mm.
const INCH_WIDTH_THRESHOLD: f64 = 75.0;

/// Vehicle and fitment facet of one import row.
#[derive(Debug, Clone)]
pub struct MappedRow {
    pub vehicle: Vehicle,
    pub fitment: Fitment,
}

/// Maps typed records into domain entities for one locale, resolving shared
/// reference keys through the per-run resolver.
pub struct RowMapper {
    locale: String,
    country: String,
    resolver: Arc<ReferenceResolver>,
}

impl RowMapper {
    pub fn new(locale: &str, resolver: Arc<ReferenceResolver>) -> Self {
        let country = locale.split('_').next().unwrap_or(locale).to_string();
        Self {
            locale: locale.to_string(),
            country,
            resolver,
        }
    }

    pub async fn map_row(&self, line: &str) -> Result<MappedRow> {
        let record = row_schema::parse_row(line)?;
        if record.vehicle_id.is_empty() || record.fitment_id.is_empty() {
            return Err(AppError::ParseError(
                "Row is missing vehicle or fitment id".to_string(),
            ));
        }
        let vehicle = self.map_vehicle(&record).await?;
        let fitment = Self::map_fitment(&record);
        Ok(MappedRow { vehicle, fitment })
    }

    pub async fn map_vehicle(&self, record: &ImportRecord) -> Result<Vehicle> {
        let manufacturer = self
            .resolver
            .resolve_manufacturer(&self.locale, &record.manufacturer, &record.image_name)
            .await?;
        let fuel_id = self
            .resolver
            .resolve_dictionary(DictionaryTable::Fuel, &self.locale, &record.fuel)
            .await?;
        let segment_id = self
            .resolver
            .resolve_dictionary(DictionaryTable::Segment, &self.locale, &record.segment)
            .await?;
        let format_id = self
            .resolver
            .resolve_dictionary(DictionaryTable::Format, &self.locale, &record.format)
            .await?;

        let mut engine_description = LocaleMap::new();
        if !record.engine_description.is_empty() {
            engine_description.insert(self.locale.clone(), record.engine_description.clone());
        }

        Ok(Vehicle {
            id: record.vehicle_id.clone(),
            hsntsn: decode_hsntsn(&record.hsntsn),
            code: slug::model_code(&record.model),
            countries: vec![self.country.clone()],
            tpms: record.pressure_monitoring_system,
            manufacturer,
            platform: record.platform.clone(),
            start_build_year: record.start_build_year,
            start_build_month: Some(record.start_build_month.unwrap_or(1)),
            end_build_year: record.end_build_year,
            end_build_month: Some(record.end_build_month.unwrap_or(12)),
            segment_id,
            fuel_id,
            volume: record.hubraum,
            engine_description,
            engine_size_kw: record.engine_size_kw,
            engine_size_ps: record
                .engine_size_kw
                .map(|kw| (kw as f64 * KW_TO_PS).round() as i32),
            format_id,
            max_speed: record.max_speed,
            weight: record.weight,
            axle_load: AxleLoad {
                front: record.axle_load_front,
                rear: record.axle_load_rear,
            },
            model_name: record.model.clone(),
        })
    }

    pub fn map_fitment(record: &ImportRecord) -> Fitment {
        let front = dimension(
            record.front_width,
            record.front_height,
            record.front_rim,
            &record.front_load_index,
            &record.front_speed_index,
        );
        let rear = dimension(
            record.rear_width,
            record.rear_height,
            record.rear_rim,
            &record.rear_load_index,
            &record.rear_speed_index,
        );

        Fitment {
            id: record.fitment_id.clone(),
            vehicle_id: record.vehicle_id.clone(),
            highway_pressure: AxlePressure {
                front: record.highway_pressure_front,
                rear: record.highway_pressure_rear,
            },
            normal_pressure: AxlePressure {
                front: record.normal_pressure_front,
                rear: record.normal_pressure_rear,
            },
            dimensions: Dimensions::new(front, rear),
        }
    }
}

fn dimension(
    width: Option<f64>,
    height: Option<i32>,
    rim: Option<i32>,
    load_index: &str,
    speed_index: &str,
) -> Dimension {
    let (width_mm, width_inch) = split_width(width);
    let (load_index, load_index2) = parse_load_index(load_index);
    Dimension {
        width_mm,
        width_inch,
        rim,
        load_index,
        load_index2,
        speed_index: parse_speed_index(speed_index),
        aspect_ratio: height,
    }
}

fn split_width(width: Option<f64>) -> (Option<f64>, Option<f64>) {
    match width {
        Some(w) if w < INCH_WIDTH_THRESHOLD => (None, Some(w)),
        Some(w) => (Some(w), None),
        None => (None, None),
    }
}

/// `"82"` or `"195/10"`; zero stands for unknown in the export.
fn parse_load_index(raw: &str) -> (Option<i32>, Option<i32>) {
    let mut parts = raw.trim().splitn(2, '/');
    let load_index = parts
        .next()
        .and_then(|p| p.parse::<i32>().ok())
        .filter(|&v| v != 0);
    let load_index2 = parts
        .next()
        .and_then(|p| p.parse::<i32>().ok())
        .filter(|&v| v != 0);
    (load_index, load_index2)
}

fn parse_speed_index(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "0" {
        return None;
    }
    Some(trimmed.to_string())
}

/// `"4001 150,4136 320"` → ordered hsn/tsn pairs.
fn decode_hsntsn(raw: &str) -> Vec<HsnTsn> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let mut parts = pair.trim().split_whitespace();
            HsnTsn {
                hsn: parts.next().unwrap_or("").to_string(),
                tsn: parts.next().unwrap_or("").to_string(),
            }
        })
        .collect()
}
