use std::collections::BTreeMap;

use ndarray::Array2;
use serde::Serialize;

/// Reduced features of one point, keyed by fully-qualified variable name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub lat: f64,
    pub lon: f64,
    pub values: BTreeMap<String, f64>,
}

impl FeatureRecord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: String, value: f64) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Variable names in sorted order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Unreduced sample of one point (`images` analysis).
#[derive(Debug, Clone, PartialEq)]
pub struct RawPatch {
    pub lat: f64,
    pub lon: f64,
    pub year: i32,
    pub dataset: String,
    pub band: String,
    pub data: Array2<f64>,
}

/// What the point processor hands back to the work-distribution layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutput {
    Features(FeatureRecord),
    Image(RawPatch),
}

impl PointOutput {
    pub fn lat_lon(&self) -> (f64, f64) {
        match self {
            PointOutput::Features(r) => (r.lat, r.lon),
            PointOutput::Image(p) => (p.lat, p.lon),
        }
    }

    pub fn into_features(self) -> Option<FeatureRecord> {
        match self {
            PointOutput::Features(r) => Some(r),
            PointOutput::Image(_) => None,
        }
    }

    pub fn into_image(self) -> Option<RawPatch> {
        match self {
            PointOutput::Image(p) => Some(p),
            PointOutput::Features(_) => None,
        }
    }
}
