//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, serialization, TIFF and configuration errors, and
//! provides semantic variants for numeric coercion and aggregation failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Imagery service error: {0}")]
    Sample(#[from] crate::io::SampleError),

    #[error("Imagery catalog error: {0}")]
    Catalog(#[from] crate::io::CatalogError),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Not a number: {value:?}")]
    InvalidNumber { value: String },

    #[error(
        "Inconsistent variables for point ({lat}, {lon}): missing [{}], unexpected [{}]",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    ShapeMismatch {
        lat: f64,
        lon: f64,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Conflicting values for {variable} at ({lat}, {lon})")]
    MergeConflict { variable: String, lat: f64, lon: f64 },

    #[error("No feature records to aggregate")]
    EmptyBatch,

    #[error("Result already has a time dimension")]
    TimeDimensionExists,

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }
}
