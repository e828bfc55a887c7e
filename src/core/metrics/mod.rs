//! Patch reducers: frequency statistics, NaN-aware summaries and per-class
//! coverage. All reducers are pure and return documented sentinels instead
//! of failing on empty input.
pub mod coverage;
pub mod stats;

pub use coverage::{built_percent, burnt_percent, percent_coverage};
pub use stats::{
    SummaryStats, mode, nan_max, nan_mean, nan_min, nan_variance, nonzero_mode, nonzero_variance,
    unique_counts,
};
