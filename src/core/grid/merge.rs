use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use tracing::debug;

use super::{GriddedResult, LAT, LON};
use crate::core::record::FeatureRecord;
use crate::error::{Error, Result};

/// Sorted, de-duplicated coordinate axis.
fn axis(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v.dedup_by(|a, b| a.total_cmp(b).is_eq());
    v
}

fn index_of(axis: &[f64], value: f64) -> Option<usize> {
    axis.binary_search_by(|probe| probe.total_cmp(&value)).ok()
}

/// Variable names shared by every record; errors on the first record whose
/// names differ from those of the first one.
pub fn check_consistent(records: &[FeatureRecord]) -> Result<Vec<String>> {
    let first = records.first().ok_or(Error::EmptyBatch)?;
    let expected: BTreeSet<&str> = first.variable_names().collect();

    for r in &records[1..] {
        let got: BTreeSet<&str> = r.variable_names().collect();
        if got != expected {
            return Err(Error::ShapeMismatch {
                lat: r.lat,
                lon: r.lon,
                missing: expected.difference(&got).map(|s| s.to_string()).collect(),
                unexpected: got.difference(&expected).map(|s| s.to_string()).collect(),
            });
        }
    }
    Ok(expected.into_iter().map(String::from).collect())
}

/// Merge records into a (lat, lon) grid. Cells without a record are NaN.
///
/// Records sharing a coordinate must agree on every variable, where a NaN
/// agrees with any value and the value is kept. The result does not depend
/// on record order.
pub fn merge(records: &[FeatureRecord]) -> Result<GriddedResult> {
    let names = check_consistent(records)?;
    let lat = axis(records.iter().map(|r| r.lat));
    let lon = axis(records.iter().map(|r| r.lon));
    let shape = (lat.len(), lon.len());

    let mut grids: BTreeMap<String, Array2<f64>> = names
        .into_iter()
        .map(|n| (n, Array2::from_elem(shape, f64::NAN)))
        .collect();

    for r in records {
        let (Some(i), Some(j)) = (index_of(&lat, r.lat), index_of(&lon, r.lon)) else {
            return Err(Error::Processing(format!(
                "coordinate ({}, {}) missing from axes",
                r.lat, r.lon
            )));
        };
        for (name, &value) in &r.values {
            let Some(grid) = grids.get_mut(name) else {
                continue;
            };
            let cell = &mut grid[(i, j)];
            if value.is_nan() {
                continue;
            }
            if !cell.is_nan() && *cell != value {
                return Err(Error::MergeConflict {
                    variable: name.clone(),
                    lat: r.lat,
                    lon: r.lon,
                });
            }
            *cell = value;
        }
    }

    debug!(
        "Merged {} records into {} lat x {} lon, {} variables",
        records.len(),
        lat.len(),
        lon.len(),
        grids.len()
    );

    Ok(GriddedResult {
        dims: vec![LAT, LON],
        lat,
        lon,
        time: None,
        data_vars: grids.into_iter().map(|(k, v)| (k, v.into_dyn())).collect(),
    })
}
