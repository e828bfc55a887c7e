//! Result aggregation: per-point feature records into one labelled grid.
pub mod merge;
pub mod time;

pub use merge::{check_consistent, merge};
pub use time::{LEAP_YEARS, add_time_dimension, daily_timestamps, is_leap_year};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::ArrayD;

pub const LAT: &str = "lat";
pub const LON: &str = "lon";
pub const TIME: &str = "time";

/// Dataset keyed by (lat, lon) and optionally time. Every variable shares
/// the dimension order in `dims`.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedResult {
    pub dims: Vec<&'static str>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub time: Option<Vec<NaiveDate>>,
    pub data_vars: BTreeMap<String, ArrayD<f64>>,
}

impl GriddedResult {
    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.data_vars.keys().map(String::as_str)
    }

    pub fn variable(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.data_vars.get(name)
    }

    /// Length of each entry of `dims`.
    pub fn shape(&self) -> Vec<usize> {
        self.dims
            .iter()
            .map(|d| match *d {
                LAT => self.lat.len(),
                LON => self.lon.len(),
                _ => self.time.as_ref().map_or(0, Vec::len),
            })
            .collect()
    }

    /// Value of a variable at a (lat, lon) coordinate, first time step.
    pub fn value_at(&self, name: &str, lat: f64, lon: f64) -> Option<f64> {
        let var = self.data_vars.get(name)?;
        let i = self.lat.iter().position(|&v| v == lat)?;
        let j = self.lon.iter().position(|&v| v == lon)?;
        let index: Vec<usize> = self
            .dims
            .iter()
            .map(|d| match *d {
                LAT => i,
                LON => j,
                _ => 0,
            })
            .collect();
        var.get(index.as_slice()).copied()
    }
}
