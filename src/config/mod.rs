//! Run configuration: validates user inputs against the dataset table and
//! writes the resolved configuration next to the other config files.
//!
//! All validation happens here, before any point is sampled.
pub mod datasets;
pub mod date;
pub mod region;

pub use datasets::{DatasetDescriptor, builtin, builtin_descriptors, load_descriptors};
pub use date::{QueryDate, check_query_date};
pub use region::{Region, RegionKind, resolve_region};

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::core::buffer::Numeric;
use crate::types::{AnalysisType, Month};

/// Errors encountered when building a run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Dataset not supported: {0}. Select one of modis, fire, population, nightlight, human_settlement_layer_built_up or global_human_modification"
    )]
    UnknownDataset(String),
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Date {date} outside dataset range {min}..={max}")]
    DateOutOfRange {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
    #[error("Region must be one of {} or a path to a point list, got {region}", .accepted.join(", "))]
    InvalidRegion {
        region: String,
        accepted: Vec<String>,
    },
    #[error("Point list {path} has {lats} lats but {lons} lons")]
    InvalidPointList { path: PathBuf, lats: usize, lons: usize },
    #[error("Band {band} must be one of: {}", .supported.join(", "))]
    UnsupportedBand {
        band: String,
        supported: Vec<String>,
    },
    #[error("Invalid buffer size: {0}")]
    InvalidBuffer(String),
    #[error("Invalid value for {flag}: {value}")]
    InvalidFlag { flag: &'static str, value: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `y/yes/true` or `n/no/false`, any case.
pub fn parse_add_time(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Ok(true),
        "n" | "no" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            flag: "add_time",
            value: value.to_string(),
        }),
    }
}

/// User inputs for one run, before validation.
#[derive(Debug, Clone)]
pub struct ConfigRequest {
    pub gee_data: String,
    pub region: String,
    pub date: String,
    pub analysis_type: AnalysisType,
    pub add_time: bool,
    pub buffer_size: Numeric,
    pub configs_dir: PathBuf,
    pub save_dir: PathBuf,
    pub band: Option<String>,
}

/// Validated configuration the pipeline runs from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub region: Region,
    pub dataset: DatasetDescriptor,
    pub band: String,
    pub date: NaiveDate,
    pub query_year: i32,
    pub query_month: Month,
    pub analysis_type: AnalysisType,
    /// Buffer radius in metres
    pub buffer_size: f64,
    pub save_dir: PathBuf,
    pub add_time: bool,
}

impl RunConfig {
    /// `config_{extent}_{gee_data}_{date}_buffersize_{buffer}_{analysis}.json`
    pub fn file_name(&self, gee_data: &str) -> String {
        format!(
            "config_{}_{}_{}_buffersize_{}_{}.json",
            self.region.extent,
            gee_data,
            self.date.format(date::DATE_FORMAT),
            self.buffer_size,
            self.analysis_type
        )
    }

    pub fn write(&self, configs_dir: &Path, gee_data: &str) -> Result<PathBuf, ConfigError> {
        let path = configs_dir.join(self.file_name(gee_data));
        let file = File::create(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self).map_err(|source| ConfigError::Json {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(file).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn buffer_metres(value: &Numeric) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::InvalidBuffer(format!("{value:?}"));
    let b = value.as_f64().map_err(|_| invalid())?;
    if b.is_finite() && b > 0.0 { Ok(b) } else { Err(invalid()) }
}

/// Validate inputs and write the run configuration to `configs_dir`.
pub fn generate_config(req: &ConfigRequest) -> Result<(RunConfig, PathBuf), ConfigError> {
    fs::create_dir_all(&req.configs_dir).map_err(|source| ConfigError::Io {
        path: req.configs_dir.clone(),
        source,
    })?;

    let descriptors = load_descriptors(&req.configs_dir)?;
    let dataset = datasets::lookup(&descriptors, &req.gee_data)?;
    dataset.family()?;
    let query = check_query_date(&req.date, &dataset)?;
    let region = resolve_region(&req.region, &req.configs_dir)?;
    let band = dataset.resolve_band(req.band.as_deref())?;
    let buffer_size = buffer_metres(&req.buffer_size)?;

    let config = RunConfig {
        region,
        dataset,
        band,
        date: query.date,
        query_year: query.query_year,
        query_month: query.query_month,
        analysis_type: req.analysis_type,
        buffer_size,
        save_dir: req.save_dir.clone(),
        add_time: req.add_time,
    };
    let path = config.write(&req.configs_dir, &req.gee_data)?;
    info!(
        "Config for {} over {} ({} points) written to {}",
        config.dataset.name,
        config.region.extent,
        config.region.len(),
        path.display()
    );
    Ok((config, path))
}
