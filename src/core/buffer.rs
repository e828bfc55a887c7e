//! Sampling-window policy: how large a buffer may be at a given pixel
//! resolution before the sampling service refuses it, and which coarser
//! resolution brings an oversized buffer back under the pixel ceiling.
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pixel ceiling of a single rectangle sample.
pub const MAX_PIXELS: f64 = 262_144.0;

/// A number that may arrive as text (CLI flags, hand-written configs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Numeric::Number(v) => Ok(*v),
            Numeric::Text(s) => s.trim().parse::<f64>().map_err(|_| Error::InvalidNumber {
                value: s.clone(),
            }),
        }
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::Number(v)
    }
}

impl From<u32> for Numeric {
    fn from(v: u32) -> Self {
        Numeric::Number(v as f64)
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::Number(v as f64)
    }
}

impl From<&str> for Numeric {
    fn from(s: &str) -> Self {
        Numeric::Text(s.to_string())
    }
}

impl From<String> for Numeric {
    fn from(s: String) -> Self {
        Numeric::Text(s)
    }
}

#[inline]
fn pixel_radius() -> f64 {
    (MAX_PIXELS / PI).sqrt()
}

/// Largest buffer radius (same linear unit as `resolution`) that stays within
/// [`MAX_PIXELS`].
pub fn max_allowable_buffer(resolution: impl Into<Numeric>) -> Result<f64> {
    let resolution = resolution.into().as_f64()?;
    Ok(pixel_radius() * resolution)
}

/// Coarser resolution for a buffer that exceeds the allowable radius, with a
/// factor-two margin.
pub fn resampled_resolution(buffer_size: impl Into<Numeric>) -> Result<f64> {
    let buffer_size = buffer_size.into().as_f64()?;
    Ok((buffer_size / pixel_radius()) * 2.0)
}

pub fn needs_resampling(buffer_size: impl Into<Numeric>, resolution: impl Into<Numeric>) -> Result<bool> {
    let buffer_size = buffer_size.into().as_f64()?;
    Ok(buffer_size > max_allowable_buffer(resolution)?)
}
