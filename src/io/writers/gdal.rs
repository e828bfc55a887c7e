use std::collections::BTreeMap;
use std::path::Path;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{DriverManager, Metadata};
use tracing::info;

use crate::core::grid::GriddedResult;
use crate::error::Result;

/// Geotransform of a regular lat/lon grid, north-up. `None` when either axis
/// is irregular or too short to infer spacing.
fn grid_geotransform(lat: &[f64], lon: &[f64]) -> Option<[f64; 6]> {
    fn step(axis: &[f64]) -> Option<f64> {
        let d = axis.get(1)? - axis.first()?;
        let regular = axis
            .windows(2)
            .all(|w| ((w[1] - w[0]) - d).abs() < 1e-9 * d.abs().max(1.0));
        (regular && d > 0.0).then_some(d)
    }
    let dy = step(lat)?;
    let dx = step(lon)?;
    let north = lat.last()? + dy / 2.0;
    let west = lon.first()? - dx / 2.0;
    Some([west, dx, 0.0, north, 0.0, -dy])
}

/// Write a gridded result as a multi-band GeoTIFF: one f64 band per
/// variable, rows north to south. Time-expanded results store the first
/// time step since values are constant along time.
pub fn write_gridded_gdal(
    result: &GriddedResult,
    attrs: &BTreeMap<String, String>,
    path: &Path,
) -> Result<()> {
    let (rows, cols) = (result.lat.len(), result.lon.len());
    let names: Vec<&str> = result.variable_names().collect();

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<f64, _>(path, cols, rows, names.len())?;

    if let Some(gt) = grid_geotransform(&result.lat, &result.lon) {
        ds.set_geo_transform(&gt)?;
        ds.set_spatial_ref(&SpatialRef::from_epsg(4326)?)?;
    }
    for (key, value) in attrs {
        ds.set_metadata_item(key, value, "")?;
    }

    for (idx, name) in names.iter().enumerate() {
        let mut data = Vec::with_capacity(rows * cols);
        for &lat in result.lat.iter().rev() {
            for &lon in &result.lon {
                data.push(result.value_at(name, lat, lon).unwrap_or(f64::NAN));
            }
        }
        let mut band = ds.rasterband(idx + 1)?;
        band.set_description(name)?;
        band.set_no_data_value(Some(f64::NAN))?;
        let mut buf = Buffer::new((cols, rows), data);
        band.write((0, 0), (cols, rows), &mut buf)?;
    }

    info!("Saved {} bands to {:?}", names.len(), path);
    Ok(())
}
