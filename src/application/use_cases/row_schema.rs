use once_cell::sync::Lazy;

use crate::domain::error::{AppError, Result};
use crate::domain::import::ImportRecord;

pub const DELIMITER: char = ';';

type Apply = fn(&mut ImportRecord, &str);

/// One column of the catalog export: its logical name and the setter that
/// writes the parsed value into the record.
pub struct ColumnSpec {
    pub name: &'static str,
    apply: Apply,
}

fn spec(name: &'static str, apply: Apply) -> ColumnSpec {
    ColumnSpec { name, apply }
}

/// Columns the importer does not consume. Kept in the schema so positions and
/// the expected column count stay explicit.
fn skip(_: &mut ImportRecord, _: &str) {}

fn text(field: &str) -> String {
    field.trim().to_string()
}

/// SAP-style numerics: blank and `-` mean absent, garbage is treated the same
/// way rather than failing the row.
fn int(field: &str) -> Option<i32> {
    let trimmed = field.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse().ok()
}

fn float(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse().ok()
}

/// Build years: the export writes `0` for unknown.
fn year(field: &str) -> Option<i32> {
    int(field).filter(|&y| y != 0)
}

fn boolean(field: &str) -> bool {
    matches!(field.trim().to_lowercase().as_str(), "1" | "x" | "true")
}

/// The fixed column layout of a fitment export row, in file order.
pub static IMPORT_SCHEMA: Lazy<Vec<ColumnSpec>> = Lazy::new(|| {
    vec![
        spec("vehicleId", |r, v| r.vehicle_id = text(v)),
        spec("fitment", |r, v| r.fitment_id = text(v)),
        spec("hsntsn", |r, v| r.hsntsn = text(v)),
        spec("manufacturer", |r, v| r.manufacturer = text(v)),
        spec("segment", |r, v| r.segment = text(v)),
        spec("model", |r, v| r.model = text(v)),
        spec("platform", |r, v| r.platform = text(v)),
        spec("startBuildYear", |r, v| r.start_build_year = year(v)),
        spec("startBuildMonth", |r, v| r.start_build_month = int(v)),
        spec("endBuildYear", |r, v| r.end_build_year = year(v)),
        spec("endBuildMonth", |r, v| r.end_build_month = int(v)),
        spec("fuel", |r, v| r.fuel = text(v)),
        spec("hubraum", |r, v| r.hubraum = int(v)),
        spec("engineDescription", |r, v| r.engine_description = text(v)),
        spec("engineSizeKW", |r, v| r.engine_size_kw = int(v)),
        spec("format", |r, v| r.format = text(v)),
        spec("normalPressureFront", |r, v| r.normal_pressure_front = float(v)),
        spec("highwayPressureFront", |r, v| r.highway_pressure_front = float(v)),
        spec("normalPressureRear", |r, v| r.normal_pressure_rear = float(v)),
        spec("highwayPressureRear", |r, v| r.highway_pressure_rear = float(v)),
        spec("engineCode", skip),
        spec("pressureMonitoringSystem", |r, v| {
            r.pressure_monitoring_system = boolean(v)
        }),
        spec("frontWidth", |r, v| r.front_width = float(v)),
        spec("frontHeight", |r, v| r.front_height = int(v)),
        spec("frontRim", |r, v| r.front_rim = int(v)),
        spec("frontLoadIndex", |r, v| r.front_load_index = text(v)),
        spec("frontSpeedIndex", |r, v| r.front_speed_index = text(v)),
        spec("frontMatnr", skip),
        spec("rearWidth", |r, v| r.rear_width = float(v)),
        spec("rearHeight", |r, v| r.rear_height = int(v)),
        spec("rearRim", |r, v| r.rear_rim = int(v)),
        spec("rearLoadIndex", |r, v| r.rear_load_index = text(v)),
        spec("rearSpeedIndex", |r, v| r.rear_speed_index = text(v)),
        spec("rearMatnr", skip),
        spec("imageName", |r, v| r.image_name = text(v)),
        spec("design", skip),
        spec("maxSpeed", |r, v| r.max_speed = int(v)),
        spec("weight", |r, v| r.weight = float(v)),
        spec("axleLoadFront", |r, v| r.axle_load_front = int(v)),
        spec("axleLoadRear", |r, v| r.axle_load_rear = int(v)),
    ]
});

/// Split one normalized row into its typed record. A row with the wrong
/// column count is structurally malformed and unprocessable.
pub fn parse_row(line: &str) -> Result<ImportRecord> {
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() != IMPORT_SCHEMA.len() {
        return Err(AppError::ParseError(format!(
            "Malformed row: expected {} columns, got {}",
            IMPORT_SCHEMA.len(),
            fields.len()
        )));
    }

    let mut record = ImportRecord::default();
    for (spec, field) in IMPORT_SCHEMA.iter().zip(fields) {
        (spec.apply)(&mut record, field);
    }
    Ok(record)
}

#[cfg(test)]
pub(crate) const FIXTURE_ROW: &str = "P00000100000016;00354000001600354;4001 150,4136 320,4136 340;Alfa Romeo;\
Auto segmentu C;Alfa 145/146;930;1997;1;2001;1;Benzyna;1370;1.4 TS(76 KW, 103 PS);\
76;Hatchback;2.6;2.8;2.2;2.6;;0;175;65;14;82;H;;175;65;14;82;H;;alfa145y;Hatchback;185;1655;950;900";
