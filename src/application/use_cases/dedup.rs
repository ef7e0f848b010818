use std::collections::HashSet;

use crate::application::use_cases::row_mapper::MappedRow;

/// Result of splitting a chunk's mapped rows by first occurrence.
///
/// `unique` holds the first row per vehicle id and drives model, vehicle and
/// fitment writes; `duplicated` holds further fitments of already-seen
/// vehicles and drives fitment writes only. Exact fitment re-occurrences are
/// dropped, re-writing them would be a no-op.
#[derive(Debug, Default)]
pub struct DedupPartition {
    pub unique: Vec<MappedRow>,
    pub duplicated: Vec<MappedRow>,
}

/// Partition an ordered batch of mapped rows.
pub fn partition(rows: Vec<MappedRow>) -> DedupPartition {
    let mut seen_vehicles: HashSet<String> = HashSet::new();
    let mut seen_fitments: HashSet<String> = HashSet::new();
    let mut result = DedupPartition::default();

    for row in rows {
        if seen_vehicles.insert(row.vehicle.id.clone()) {
            seen_fitments.insert(row.fitment.id.clone());
            result.unique.push(row);
        } else if seen_fitments.insert(row.fitment.id.clone()) {
            result.duplicated.push(row);
        }
    }

    result
}
