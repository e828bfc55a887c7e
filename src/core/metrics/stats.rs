use ndarray::Array2;

/// Running count, extremes and Welford mean/M2 over the accepted cells.
#[derive(Debug, Clone, Copy)]
pub struct SummaryStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population variance.
    pub var: f64,
}

impl SummaryStats {
    /// Statistics over every value for which `keep` returns true. NaN cells
    /// are always skipped. Returns `None` when nothing is kept.
    pub fn collect<F>(patch: &Array2<f64>, keep: F) -> Option<Self>
    where
        F: Fn(f64) -> bool,
    {
        let mut count: u64 = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut mean = 0.0_f64;
        let mut m2 = 0.0_f64;

        for &v in patch.iter() {
            if v.is_nan() || !keep(v) {
                continue;
            }
            count += 1;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
            let delta = v - mean;
            mean += delta / (count as f64);
            m2 += delta * (v - mean);
        }

        if count == 0 {
            return None;
        }

        Some(SummaryStats {
            count: count as usize,
            min,
            max,
            mean,
            var: m2 / (count as f64),
        })
    }

    pub fn of(patch: &Array2<f64>) -> Option<Self> {
        Self::collect(patch, |_| true)
    }
}

/// Distinct non-NaN values in ascending order with their cell counts.
pub fn unique_counts(patch: &Array2<f64>) -> Vec<(f64, usize)> {
    let mut values: Vec<f64> = patch.iter().copied().filter(|v| !v.is_nan()).collect();
    values.sort_unstable_by(f64::total_cmp);

    let mut runs: Vec<(f64, usize)> = Vec::new();
    for v in values {
        match runs.last_mut() {
            Some((last, count)) if *last == v => *count += 1,
            _ => runs.push((v, 1)),
        }
    }
    runs
}

/// First maximum of an ascending run list, i.e. the lowest value on ties.
fn first_max(runs: &[(f64, usize)]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    for &(value, count) in runs {
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(v, _)| v)
}

/// Most frequent value; ties go to the lowest value. NaN when the patch has
/// no valid cells.
pub fn mode(patch: &Array2<f64>) -> f64 {
    first_max(&unique_counts(patch)).unwrap_or(f64::NAN)
}

/// Mode ignoring zero fill cells; 0 when nothing else is left.
pub fn nonzero_mode(patch: &Array2<f64>) -> f64 {
    let runs: Vec<(f64, usize)> = unique_counts(patch)
        .into_iter()
        .filter(|(v, _)| *v != 0.0)
        .collect();
    first_max(&runs).unwrap_or(0.0)
}

/// Population variance over non-zero, non-NaN cells; 0 when none remain.
pub fn nonzero_variance(patch: &Array2<f64>) -> f64 {
    SummaryStats::collect(patch, |v| v != 0.0)
        .map(|s| s.var)
        .unwrap_or(0.0)
}

pub fn nan_variance(patch: &Array2<f64>) -> f64 {
    SummaryStats::of(patch).map(|s| s.var).unwrap_or(f64::NAN)
}

pub fn nan_mean(patch: &Array2<f64>) -> f64 {
    SummaryStats::of(patch).map(|s| s.mean).unwrap_or(f64::NAN)
}

pub fn nan_min(patch: &Array2<f64>) -> f64 {
    SummaryStats::of(patch).map(|s| s.min).unwrap_or(f64::NAN)
}

pub fn nan_max(patch: &Array2<f64>) -> f64 {
    SummaryStats::of(patch).map(|s| s.max).unwrap_or(f64::NAN)
}
