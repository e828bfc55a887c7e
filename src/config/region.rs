//! Sampling regions: named boxes over the global grid, the TOAR station
//! list, or a custom point list on disk.
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ConfigError;

pub const GLOBE_COORDS_FILE: &str = "globe_coords.json";
pub const TOAR_LOCATIONS_FILE: &str = "toar_locations.json";
pub const TOAR_REGION: &str = "toar2";
pub const CUSTOM_EXTENT: &str = "custom";

/// Default global grid spacing in degrees (lat, lon).
pub const GLOBE_STEP: (f64, f64) = (2.0, 2.5);

/// Named lat/lon boxes as `(name, [min_lat, max_lat], [min_lon, max_lon])`.
pub const NAMED_REGIONS: [(&str, [f64; 2], [f64; 2]); 10] = [
    ("globe", [-90.0, 90.0], [-180.0, 180.0]),
    ("europe", [35.0, 65.0], [-10.0, 25.0]),
    ("asia", [20.0, 50.0], [100.0, 145.0]),
    ("australia", [-50.0, -5.0], [110.0, 160.0]),
    ("north_america", [20.0, 55.0], [-125.0, -70.0]),
    ("west_europe", [25.0, 80.0], [-20.0, 10.0]),
    ("east_europe", [25.0, 80.0], [10.0, 40.0]),
    ("west_north_america", [10.0, 80.0], [-140.0, -95.0]),
    ("east_north_america", [10.0, 80.0], [-95.0, -50.0]),
    ("mini_test", [10.0, 15.0], [-95.0, -90.0]),
];

/// How the coordinate lists combine into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Every lon × lat combination
    Grid,
    /// `lats[i]` pairs with `lons[i]`
    Points,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub extent: String,
    pub kind: RegionKind,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl Region {
    /// `(lat, lon)` pairs. Grid regions iterate longitude-major.
    pub fn points(&self) -> Vec<(f64, f64)> {
        match self.kind {
            RegionKind::Grid => self
                .lons
                .iter()
                .flat_map(|&lon| self.lats.iter().map(move |&lat| (lat, lon)))
                .collect(),
            RegionKind::Points => self
                .lats
                .iter()
                .copied()
                .zip(self.lons.iter().copied())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self.kind {
            RegionKind::Grid => self.lats.len() * self.lons.len(),
            RegionKind::Points => self.lats.len().min(self.lons.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_point_list(&self) -> bool {
        self.kind == RegionKind::Points
    }
}

/// Lat and lon axes of a global grid. Longitudes stop short of 180 so the
/// antimeridian is not sampled twice.
pub fn globe_grid(lat_step: f64, lon_step: f64) -> (Vec<f64>, Vec<f64>) {
    let n_lat = (180.0 / lat_step).round() as usize;
    let n_lon = (360.0 / lon_step).round() as usize;
    let lats = (0..=n_lat).map(|i| -90.0 + i as f64 * lat_step).collect();
    let lons = (0..n_lon).map(|i| -180.0 + i as f64 * lon_step).collect();
    (lats, lons)
}

#[derive(Debug, Serialize, Deserialize)]
struct CoordLists {
    lats: Vec<f64>,
    lons: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct GlobeFile {
    globe: CoordLists,
}

#[derive(Debug, Deserialize)]
struct ToarFile {
    toar2: CoordLists,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(file).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn point_list(extent: &str, path: &Path, lists: CoordLists) -> Result<Region, ConfigError> {
    if lists.lats.len() != lists.lons.len() {
        return Err(ConfigError::InvalidPointList {
            path: path.to_path_buf(),
            lats: lists.lats.len(),
            lons: lists.lons.len(),
        });
    }
    Ok(Region {
        extent: extent.to_string(),
        kind: RegionKind::Points,
        lats: lists.lats,
        lons: lists.lons,
    })
}

fn globe_axes(configs_dir: &Path) -> Result<(Vec<f64>, Vec<f64>), ConfigError> {
    let path = configs_dir.join(GLOBE_COORDS_FILE);
    if path.is_file() {
        let globe: GlobeFile = read_json(&path)?;
        return Ok((globe.globe.lats, globe.globe.lons));
    }
    Ok(globe_grid(GLOBE_STEP.0, GLOBE_STEP.1))
}

/// Resolve a region argument to coordinates.
pub fn resolve_region(region: &str, configs_dir: &Path) -> Result<Region, ConfigError> {
    if region == TOAR_REGION {
        let path = configs_dir.join(TOAR_LOCATIONS_FILE);
        let toar: ToarFile = read_json(&path)?;
        return point_list(TOAR_REGION, &path, toar.toar2);
    }

    if let Some((name, lat_box, lon_box)) = NAMED_REGIONS.iter().find(|(n, _, _)| *n == region) {
        let (lats, lons) = globe_axes(configs_dir)?;
        let within = |v: f64, b: &[f64; 2]| b[0] <= v && v <= b[1];
        return Ok(Region {
            extent: name.to_string(),
            kind: RegionKind::Grid,
            lats: lats.into_iter().filter(|&v| within(v, lat_box)).collect(),
            lons: lons.into_iter().filter(|&v| within(v, lon_box)).collect(),
        });
    }

    let path = Path::new(region);
    if path.is_file() {
        info!("Using custom region at path: {}", path.display());
        let lists: CoordLists = read_json(path)?;
        return point_list(CUSTOM_EXTENT, path, lists);
    }

    let mut accepted: Vec<String> = NAMED_REGIONS.iter().map(|(n, _, _)| n.to_string()).collect();
    accepted.push(TOAR_REGION.to_string());
    Err(ConfigError::InvalidRegion {
        region: region.to_string(),
        accepted,
    })
}
