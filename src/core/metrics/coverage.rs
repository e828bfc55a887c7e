use ndarray::Array2;

use crate::core::metrics::stats::unique_counts;
use crate::core::taxonomy::{BUILT_CLASSES, CoverageTable, Taxonomy, UNBURNT_CODE};

#[inline]
fn as_class_code(v: f64) -> Option<i64> {
    if v.fract() == 0.0 && v.is_finite() {
        Some(v as i64)
    } else {
        None
    }
}

#[inline]
fn count_code(patch: &Array2<f64>, code: i64) -> usize {
    let target = code as f64;
    patch.iter().filter(|&&v| v == target).count()
}

/// Cells other than the zero fill. Missing (NaN) cells count.
#[inline]
fn nonzero_cells(patch: &Array2<f64>) -> usize {
    patch.iter().filter(|&&v| v != 0.0).count()
}

/// Share of cells per taxonomy class.
///
/// The denominator is every cell of the patch, or every non-zero cell for
/// zero-exclusive taxonomies. Missing cells and values that are not a class
/// of the taxonomy (interpolation artifacts, no-data codes) count toward the
/// denominator but get no entry. With an empty denominator every class stays
/// at 0.
pub fn percent_coverage(patch: &Array2<f64>, taxonomy: &Taxonomy) -> CoverageTable {
    let mut table = taxonomy.coverage_table();
    let total = if taxonomy.zero_exclusive {
        nonzero_cells(patch)
    } else {
        patch.len()
    };
    if total == 0 {
        return table;
    }

    for (value, count) in unique_counts(patch) {
        if taxonomy.zero_exclusive && value == 0.0 {
            continue;
        }
        if let Some(code) = as_class_code(value) {
            table.set(code, count as f64 / total as f64);
        }
    }
    table
}

/// Share of cells that are not unburnt, missing cells included; 0 for an
/// empty patch.
pub fn burnt_percent(patch: &Array2<f64>) -> f64 {
    let total = patch.len();
    if total == 0 {
        return 0.0;
    }
    let unburnt = count_code(patch, UNBURNT_CODE);
    (total - unburnt) as f64 / total as f64
}

/// `(non-zero cells - cells in BUILT_CLASSES) / non-zero cells`, 0 when the
/// patch holds only fill. Missing cells are non-zero.
///
/// This is the share of non-zero cells outside the residential and
/// non-residential classes.
pub fn built_percent(patch: &Array2<f64>) -> f64 {
    let total = nonzero_cells(patch);
    if total == 0 {
        return 0.0;
    }
    let built: usize = BUILT_CLASSES.iter().map(|&c| count_code(patch, c)).sum();
    (total - built) as f64 / total as f64
}
