//! Imagery service seam: what the point processor needs from a source of
//! georeferenced image collections.
//!
//! Queries and images are plain descriptors; nothing is fetched until
//! [`ImageryService::first`] or [`ImageryService::sample_rectangle`] runs.
use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::params::TemporalWindow;
use crate::types::Resampling;

/// Geographic CRS used for reprojection of resampled images.
pub const WGS84: &str = "EPSG:4326";

/// Errors reported by an imagery service.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The requested rectangle has more pixels than the service allows.
    #[error("Too many pixels in sample: {requested} > {limit}")]
    PixelBudgetExceeded { requested: usize, limit: usize },
    #[error("Unknown image collection: {0}")]
    UnknownCollection(String),
    #[error("Band {band} not present in collection {collection}")]
    UnknownBand { collection: String, band: String },
    #[error("No image in {collection} between {start} and {end}")]
    EmptyCollection {
        collection: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Image {0} is no longer available")]
    MissingImage(String),
    #[error("Sampling failed: {0}")]
    Failed(String),
}

impl SampleError {
    pub fn is_pixel_budget(&self) -> bool {
        matches!(self, SampleError::PixelBudgetExceeded { .. })
    }
}

/// Band selection over a date-filtered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageQuery {
    pub collection: String,
    pub band: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ImageQuery {
    pub fn collection(id: impl Into<String>) -> Self {
        Self {
            collection: id.into(),
            band: None,
            start: None,
            end: None,
        }
    }

    pub fn select(mut self, band: impl Into<String>) -> Self {
        self.band = Some(band.into());
        self
    }

    /// Keep images dated in `[start, end)`.
    pub fn filter_date(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn filter_window(self, window: TemporalWindow) -> Self {
        self.filter_date(window.start, window.end)
    }

    pub fn accepts(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date < e)
    }
}

/// Reprojection applied on top of a resolved image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reprojection {
    pub crs: String,
    /// Output pixel size in metres
    pub scale: f64,
}

/// Handle to one resolved image band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub collection: String,
    pub band: String,
    pub date: NaiveDate,
    pub resampling: Resampling,
    pub reprojection: Option<Reprojection>,
}

impl Image {
    pub fn new(
        id: impl Into<String>,
        collection: impl Into<String>,
        band: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            band: band.into(),
            date,
            resampling: Resampling::Nearest,
            reprojection: None,
        }
    }

    pub fn resample(mut self, method: Resampling) -> Self {
        self.resampling = method;
        self
    }

    pub fn reproject(mut self, crs: impl Into<String>, scale: f64) -> Self {
        self.reprojection = Some(Reprojection {
            crs: crs.into(),
            scale,
        });
        self
    }
}

/// Square window of `buffer` metres around a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRegion {
    pub lat: f64,
    pub lon: f64,
    pub buffer: f64,
}

impl SampleRegion {
    pub fn new(lat: f64, lon: f64, buffer: f64) -> Self {
        Self { lat, lon, buffer }
    }

    pub fn shrink(&self, factor: f64) -> Self {
        Self {
            buffer: self.buffer * factor,
            ..*self
        }
    }
}

/// A source of image collections that can be sampled around points.
///
/// Implementations are shared by every worker of a batch.
pub trait ImageryService: Send + Sync {
    /// Earliest image of the query's collection and date range.
    fn first(&self, query: &ImageQuery) -> Result<Image, SampleError>;

    /// Pixel values of `image` over `region`; cells outside the image extent
    /// or masked in the source take `default_value`.
    fn sample_rectangle(
        &self,
        image: &Image,
        region: &SampleRegion,
        default_value: f64,
    ) -> Result<Array2<f64>, SampleError>;
}
