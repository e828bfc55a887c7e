use ndarray::Array2;

use crate::core::geofence::GeofencePolicy;
use crate::core::metrics::{
    built_percent, burnt_percent, mode, nan_max, nan_mean, nan_min, nan_variance, nonzero_mode,
    nonzero_variance, percent_coverage,
};
use crate::core::taxonomy::{self, Taxonomy};
use crate::types::{DatasetFamily, Resampling};

/// Per-family sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FamilyProfile {
    pub family: DatasetFamily,
    /// Fill value for cells outside the image and for geofence placeholders
    pub default_value: f64,
    pub resampling: Resampling,
    pub geofence: GeofencePolicy,
    pub taxonomy: Option<&'static Taxonomy>,
}

const SUMMARY: [&str; 4] = ["mean", "max", "min", "var"];

const POLAR: GeofencePolicy = GeofencePolicy {
    polar: true,
    open_water: false,
};
const OPEN_WATER: GeofencePolicy = GeofencePolicy {
    polar: false,
    open_water: true,
};
const POLAR_AND_OPEN_WATER: GeofencePolicy = GeofencePolicy {
    polar: true,
    open_water: true,
};

impl DatasetFamily {
    pub fn profile(&self) -> FamilyProfile {
        let (default_value, resampling, geofence, taxonomy) = match self {
            DatasetFamily::Modis => (
                17.0,
                Resampling::Nearest,
                OPEN_WATER,
                Some(&taxonomy::MODIS),
            ),
            DatasetFamily::Fire => (
                taxonomy::UNBURNT_CODE as f64,
                Resampling::Bilinear,
                POLAR_AND_OPEN_WATER,
                Some(&taxonomy::FIRE),
            ),
            DatasetFamily::Population => (0.0, Resampling::Bilinear, POLAR_AND_OPEN_WATER, None),
            DatasetFamily::Nightlight => (0.0, Resampling::Bilinear, POLAR, None),
            DatasetFamily::BuiltUp => (
                0.0,
                Resampling::Nearest,
                POLAR_AND_OPEN_WATER,
                Some(&taxonomy::BUILT_UP),
            ),
            DatasetFamily::HumanModification => {
                (0.0, Resampling::Bilinear, POLAR_AND_OPEN_WATER, None)
            }
        };
        FamilyProfile {
            family: *self,
            default_value,
            resampling,
            geofence,
            taxonomy,
        }
    }

    /// Statistic and class suffixes this family emits, in emission order.
    pub fn variable_suffixes(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = match self {
            DatasetFamily::Modis => vec!["mode", "var"],
            DatasetFamily::Fire => vec!["mode", "var", "burnt"],
            DatasetFamily::Population | DatasetFamily::Nightlight => SUMMARY.to_vec(),
            DatasetFamily::HumanModification => {
                let mut v = SUMMARY.to_vec();
                v.push("mode");
                v
            }
            DatasetFamily::BuiltUp => vec!["mode", "var", "built"],
        };
        if let Some(t) = self.profile().taxonomy {
            out.extend(t.classes.iter().map(|c| c.name));
        }
        out
    }

    /// Fully-qualified variable names, `{dataset}.{band}.{suffix}`.
    pub fn variable_names(&self, dataset: &str, band: &str) -> Vec<String> {
        self.variable_suffixes()
            .into_iter()
            .map(|s| format!("{dataset}.{band}.{s}"))
            .collect()
    }

    /// Reduce a patch to `(suffix, value)` pairs. Never fails; degenerate
    /// patches yield the reducers' sentinel values.
    pub fn reduce(&self, patch: &Array2<f64>) -> Vec<(&'static str, f64)> {
        let mut out = match self {
            DatasetFamily::Modis => vec![("mode", mode(patch)), ("var", nan_variance(patch))],
            DatasetFamily::Fire => vec![
                ("mode", mode(patch)),
                ("var", nan_variance(patch)),
                ("burnt", burnt_percent(patch)),
            ],
            DatasetFamily::Population | DatasetFamily::Nightlight => summary(patch),
            DatasetFamily::HumanModification => {
                let mut v = summary(patch);
                v.push(("mode", mode(patch)));
                v
            }
            // zero is the fill value, so mode and variance skip it
            DatasetFamily::BuiltUp => vec![
                ("mode", nonzero_mode(patch)),
                ("var", nonzero_variance(patch)),
                ("built", built_percent(patch)),
            ],
        };

        if let Some(t) = self.profile().taxonomy {
            let table = percent_coverage(patch, t);
            out.extend(table.iter().map(|(_, cov)| (cov.name, cov.pct_cov)));
        }
        out
    }
}

fn summary(patch: &Array2<f64>) -> Vec<(&'static str, f64)> {
    vec![
        ("mean", nan_mean(patch)),
        ("max", nan_max(patch)),
        ("min", nan_min(patch)),
        ("var", nan_variance(patch)),
    ]
}
