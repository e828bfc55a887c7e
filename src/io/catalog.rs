//! Local GeoTIFF catalog: builds a [`MemoryCatalog`] from a JSON manifest.
//!
//! ```json
//! {
//!   "collections": {
//!     "MODIS/006/MCD12Q1": [
//!       {
//!         "id": "2015_01_01",
//!         "date": "2015-01-01",
//!         "bands": {
//!           "LC_Type1": { "path": "modis_2015.tif", "resolution": 500.0 }
//!         }
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Band paths are relative to the manifest. Georeferencing is taken from
//! `origin`/`pixel_size` when present, otherwise from the GeoTIFF
//! ModelTiepoint and ModelPixelScale tags, and finally assumed global.
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ndarray::Array2;
use serde::Deserialize;
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, info};

use crate::io::memory::{GeoRaster, METERS_PER_DEGREE, MemoryCatalog};

/// Errors encountered when loading a catalog manifest
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("TIFF error in {path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },
    #[error("Unsupported pixel format in {0}")]
    UnsupportedPixelFormat(PathBuf),
    #[error("Raster {path} has {len} samples, expected {rows}x{cols}")]
    Shape {
        path: PathBuf,
        rows: usize,
        cols: usize,
        len: usize,
    },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    collections: BTreeMap<String, Vec<ManifestImage>>,
}

#[derive(Debug, Deserialize)]
struct ManifestImage {
    id: String,
    date: NaiveDate,
    bands: BTreeMap<String, ManifestBand>,
}

#[derive(Debug, Deserialize)]
struct ManifestBand {
    path: PathBuf,
    /// Native pixel size in metres
    resolution: Option<f64>,
    /// `[west_lon, north_lat]`
    origin: Option<[f64; 2]>,
    /// `[width_deg, height_deg]`
    pixel_size: Option<[f64; 2]>,
}

/// Raw decoded band with whatever georeferencing the file carries.
struct DecodedBand {
    data: Array2<f64>,
    tiepoint: Option<[f64; 2]>,
    scale: Option<[f64; 2]>,
}

pub fn load_catalog(manifest_path: &Path) -> Result<MemoryCatalog, CatalogError> {
    let file = File::open(manifest_path).map_err(|source| CatalogError::Io {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    let manifest: Manifest = serde_json::from_reader(file)?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut catalog = MemoryCatalog::new();
    let mut bands = 0usize;
    for (collection, images) in manifest.collections {
        for image in images {
            for (band, entry) in image.bands {
                let path = base.join(&entry.path);
                let raster = build_raster(&path, &entry)?;
                debug!(
                    "Loaded {} {} {} ({}x{})",
                    collection,
                    image.id,
                    band,
                    raster.data.nrows(),
                    raster.data.ncols()
                );
                catalog.insert(collection.as_str(), image.id.as_str(), image.date, band, raster);
                bands += 1;
            }
        }
    }
    info!(
        "Catalog {} loaded: {} band rasters",
        manifest_path.display(),
        bands
    );
    Ok(catalog)
}

fn build_raster(path: &Path, band: &ManifestBand) -> Result<GeoRaster, CatalogError> {
    let decoded = read_band(path)?;
    let (rows, cols) = decoded.data.dim();

    let [origin_lon, origin_lat] = band.origin.or(decoded.tiepoint).unwrap_or([-180.0, 90.0]);
    let [pixel_width, pixel_height] = band
        .pixel_size
        .or(decoded.scale)
        .unwrap_or([360.0 / cols as f64, 180.0 / rows as f64]);
    let resolution = band
        .resolution
        .unwrap_or(pixel_height.abs() * METERS_PER_DEGREE);

    Ok(GeoRaster::new(
        decoded.data,
        origin_lon,
        origin_lat,
        pixel_width,
        pixel_height,
        resolution,
    ))
}

fn read_band(path: &Path) -> Result<DecodedBand, CatalogError> {
    let tiff_err = |source| CatalogError::Tiff {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = Decoder::new(file).map_err(tiff_err)?;
    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let (rows, cols) = (height as usize, width as usize);

    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .map_err(tiff_err)?
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(tiff_err)?
        .filter(|v| v.len() >= 6)
        .map(|v| [v[3], v[4]]);
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .map_err(tiff_err)?
        .map(|v| v.into_f64_vec())
        .transpose()
        .map_err(tiff_err)?
        .filter(|v| v.len() >= 2)
        .map(|v| [v[0], v[1]]);
    let nodata = decoder
        .find_tag(Tag::GdalNodata)
        .map_err(tiff_err)?
        .map(|v| v.into_string())
        .transpose()
        .map_err(tiff_err)?
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let samples: Vec<f64> = match decoder.read_image().map_err(tiff_err)? {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        _ => return Err(CatalogError::UnsupportedPixelFormat(path.to_path_buf())),
    };

    let len = samples.len();
    let mut data =
        Array2::from_shape_vec((rows, cols), samples).map_err(|_| CatalogError::Shape {
            path: path.to_path_buf(),
            rows,
            cols,
            len,
        })?;
    if let Some(nd) = nodata {
        data.mapv_inplace(|v| if v == nd { f64::NAN } else { v });
    }

    Ok(DecodedBand {
        data,
        tiepoint,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::service::{ImageQuery, ImageryService, SampleRegion};
    use std::fs;
    use tiff::encoder::{TiffEncoder, colortype};

    fn write_tiff(path: &Path, cols: u32, rows: u32, data: &[f32], nodata: Option<&str>) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(cols, rows)
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, [1.0f64, 1.0, 0.0].as_slice())
            .unwrap();
        image
            .encoder()
            .write_tag(
                Tag::ModelTiepointTag,
                [0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0].as_slice(),
            )
            .unwrap();
        if let Some(nd) = nodata {
            image.encoder().write_tag(Tag::GdalNodata, nd).unwrap();
        }
        image.write_data(data).unwrap();
    }

    #[test]
    fn loads_georeferenced_tiff_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_tiff(
            &dir.path().join("lc.tif"),
            2,
            2,
            &[1.0, 2.0, 3.0, -9999.0],
            Some("-9999"),
        );
        fs::write(
            dir.path().join("manifest.json"),
            r#"{"collections": {"TEST/LC": [
                {"id": "2015", "date": "2015-01-01",
                 "bands": {"lc": {"path": "lc.tif", "resolution": 111320.0}}}
            ]}}"#,
        )
        .unwrap();

        let catalog = load_catalog(&dir.path().join("manifest.json")).unwrap();
        assert_eq!(catalog.image_count("TEST/LC"), 1);

        let image = catalog
            .first(&ImageQuery::collection("TEST/LC").select("lc"))
            .unwrap();
        // raster covers lon 10..12, lat 48..50
        let patch = catalog
            .sample_rectangle(&image, &SampleRegion::new(49.0, 11.0, METERS_PER_DEGREE), 0.0)
            .unwrap();
        // two rows, four columns once the longitude span is widened by cos(lat)
        assert_eq!(patch.dim(), (2, 4));
        assert_eq!(patch.row(0).to_vec(), vec![0.0, 1.0, 2.0, 0.0]);
        // nodata cell takes the default
        assert_eq!(patch.row(1).to_vec(), vec![0.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn manifest_georef_overrides_tags() {
        let dir = tempfile::tempdir().unwrap();
        write_tiff(&dir.path().join("b.tif"), 1, 1, &[7.0], None);
        let spec = ManifestBand {
            path: PathBuf::from("b.tif"),
            resolution: None,
            origin: Some([0.0, 1.0]),
            pixel_size: Some([0.5, 0.5]),
        };
        let raster = build_raster(&dir.path().join("b.tif"), &spec).unwrap();
        assert_eq!((raster.origin_lon, raster.origin_lat), (0.0, 1.0));
        assert_eq!(raster.pixel_width, 0.5);
        assert_eq!(raster.resolution, 0.5 * METERS_PER_DEGREE);
    }

    #[test]
    fn missing_manifest_is_io_error() {
        let err = load_catalog(Path::new("/nonexistent/manifest.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
