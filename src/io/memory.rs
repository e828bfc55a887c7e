//! In-memory imagery service over georeferenced rasters.
//!
//! Sampling follows the remote service's rules: the buffer is turned into a
//! lat/lon box, the box is gridded at the image's output pixel size, and the
//! request is refused when the grid exceeds the pixel ceiling. Near the
//! poles the longitude span of a metric buffer grows quickly, which is what
//! makes high-latitude samples overflow.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use ndarray::Array2;
use tracing::debug;

use crate::core::buffer::MAX_PIXELS;
use crate::io::service::{Image, ImageQuery, ImageryService, SampleError, SampleRegion};
use crate::types::Resampling;

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// North-up raster on a regular lat/lon grid. NaN cells are masked.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRaster {
    pub data: Array2<f64>,
    /// Longitude of the west edge
    pub origin_lon: f64,
    /// Latitude of the north edge
    pub origin_lat: f64,
    /// Pixel width in degrees
    pub pixel_width: f64,
    /// Pixel height in degrees (positive)
    pub pixel_height: f64,
    /// Nominal pixel size in metres
    pub resolution: f64,
}

impl GeoRaster {
    pub fn new(
        data: Array2<f64>,
        origin_lon: f64,
        origin_lat: f64,
        pixel_width: f64,
        pixel_height: f64,
        resolution: f64,
    ) -> Self {
        Self {
            data,
            origin_lon,
            origin_lat,
            pixel_width,
            pixel_height: pixel_height.abs(),
            resolution,
        }
    }

    /// Global raster with square pixels of `resolution` metres.
    pub fn global(data: Array2<f64>) -> Self {
        let (rows, cols) = data.dim();
        let pixel_width = 360.0 / cols as f64;
        let pixel_height = 180.0 / rows as f64;
        let resolution = pixel_height * METERS_PER_DEGREE;
        Self::new(data, -180.0, 90.0, pixel_width, pixel_height, resolution)
    }

    fn cell(&self, row: isize, col: isize) -> Option<f64> {
        let (rows, cols) = self.data.dim();
        if row < 0 || col < 0 || row as usize >= rows || col as usize >= cols {
            return None;
        }
        let v = self.data[(row as usize, col as usize)];
        if v.is_nan() { None } else { Some(v) }
    }

    fn inside(&self, x: f64, y: f64) -> bool {
        let (rows, cols) = self.data.dim();
        x >= 0.0 && y >= 0.0 && x < cols as f64 && y < rows as f64
    }

    /// Value at a location, `None` outside the extent or on masked cells.
    pub fn value_at(&self, lat: f64, lon: f64, method: Resampling) -> Option<f64> {
        let x = (lon - self.origin_lon) / self.pixel_width;
        let y = (self.origin_lat - lat) / self.pixel_height;
        if !self.inside(x, y) {
            return None;
        }
        match method {
            Resampling::Nearest => self.cell(y.floor() as isize, x.floor() as isize),
            Resampling::Bilinear => self.bilinear(x - 0.5, y - 0.5),
        }
    }

    /// Bilinear blend of the four surrounding pixel centres; masked or
    /// out-of-range neighbours are dropped and the weights renormalised.
    fn bilinear(&self, x: f64, y: f64) -> Option<f64> {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (c0, r0) = (x0 as isize, y0 as isize);

        let taps = [
            (r0, c0, (1.0 - fx) * (1.0 - fy)),
            (r0, c0 + 1, fx * (1.0 - fy)),
            (r0 + 1, c0, (1.0 - fx) * fy),
            (r0 + 1, c0 + 1, fx * fy),
        ];

        let mut sum = 0.0;
        let mut weight = 0.0;
        for (r, c, w) in taps {
            if w <= 0.0 {
                continue;
            }
            if let Some(v) = self.cell(r, c) {
                sum += v * w;
                weight += w;
            }
        }
        if weight > 0.0 { Some(sum / weight) } else { None }
    }
}

#[derive(Debug, Clone)]
struct CatalogImage {
    id: String,
    date: NaiveDate,
    bands: HashMap<String, Arc<GeoRaster>>,
}

/// Image collections held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    collections: HashMap<String, Vec<CatalogImage>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one band of one image. Images are identified by `id` within a
    /// collection; inserting another band under the same id extends it.
    pub fn insert(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        date: NaiveDate,
        band: impl Into<String>,
        raster: GeoRaster,
    ) {
        let id = id.into();
        let images = self.collections.entry(collection.into()).or_default();
        let raster = Arc::new(raster);
        match images.iter_mut().find(|img| img.id == id) {
            Some(img) => {
                img.bands.insert(band.into(), raster);
            }
            None => {
                let mut bands = HashMap::new();
                bands.insert(band.into(), raster);
                images.push(CatalogImage { id, date, bands });
                images.sort_by_key(|img| img.date);
            }
        }
    }

    pub fn with_image(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        date: NaiveDate,
        band: impl Into<String>,
        raster: GeoRaster,
    ) -> Self {
        self.insert(collection, id, date, band, raster);
        self
    }

    pub fn collection_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.collections.keys().map(String::as_str)
    }

    pub fn image_count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, Vec::len)
    }

    fn raster(&self, image: &Image) -> Result<&GeoRaster, SampleError> {
        self.collections
            .get(&image.collection)
            .and_then(|images| images.iter().find(|img| img.id == image.id))
            .and_then(|img| img.bands.get(&image.band))
            .map(|r| r.as_ref())
            .ok_or_else(|| SampleError::MissingImage(image.id.clone()))
    }
}

/// Whole pixels needed to cover `span`. Spans within rounding noise of a
/// whole count do not gain an extra pixel.
fn cells_for_span(span: f64, pixel: f64) -> f64 {
    (span / pixel - 1e-9).ceil().max(1.0)
}

fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

impl ImageryService for MemoryCatalog {
    fn first(&self, query: &ImageQuery) -> Result<Image, SampleError> {
        let images = self
            .collections
            .get(&query.collection)
            .ok_or_else(|| SampleError::UnknownCollection(query.collection.clone()))?;

        let band = match &query.band {
            Some(b) => b.clone(),
            None => {
                let mut names: Vec<&String> = images.iter().flat_map(|i| i.bands.keys()).collect();
                names.sort();
                names.dedup();
                match names.as_slice() {
                    [only] => (*only).clone(),
                    _ => {
                        return Err(SampleError::Failed(format!(
                            "collection {} has several bands; select one",
                            query.collection
                        )));
                    }
                }
            }
        };

        if !images.iter().any(|img| img.bands.contains_key(&band)) {
            return Err(SampleError::UnknownBand {
                collection: query.collection.clone(),
                band,
            });
        }

        let image = images
            .iter()
            .filter(|img| query.accepts(img.date) && img.bands.contains_key(&band))
            .min_by_key(|img| img.date)
            .ok_or_else(|| {
                let (first, last) = (
                    images.first().map(|i| i.date),
                    images.last().map(|i| i.date),
                );
                SampleError::EmptyCollection {
                    collection: query.collection.clone(),
                    start: query.start.or(first).unwrap_or(NaiveDate::MIN),
                    end: query.end.or(last).unwrap_or(NaiveDate::MAX),
                }
            })?;

        Ok(Image::new(
            image.id.clone(),
            query.collection.clone(),
            band,
            image.date,
        ))
    }

    fn sample_rectangle(
        &self,
        image: &Image,
        region: &SampleRegion,
        default_value: f64,
    ) -> Result<Array2<f64>, SampleError> {
        let raster = self.raster(image)?;

        let (pixel_width, pixel_height) = match &image.reprojection {
            Some(r) => (r.scale / METERS_PER_DEGREE, r.scale / METERS_PER_DEGREE),
            None => (raster.pixel_width, raster.pixel_height),
        };

        let half_lat = region.buffer / METERS_PER_DEGREE;
        let cos_lat = region.lat.to_radians().cos().abs();
        let half_lon = if cos_lat > 0.0 {
            (region.buffer / (METERS_PER_DEGREE * cos_lat)).min(180.0)
        } else {
            180.0
        };

        let rows_f = cells_for_span(2.0 * half_lat, pixel_height);
        let cols_f = cells_for_span(2.0 * half_lon, pixel_width);
        if rows_f * cols_f > MAX_PIXELS {
            return Err(SampleError::PixelBudgetExceeded {
                requested: (rows_f * cols_f).min(usize::MAX as f64) as usize,
                limit: MAX_PIXELS as usize,
            });
        }
        let (rows, cols) = (rows_f as usize, cols_f as usize);

        debug!(
            "Sampling {} ({}) at ({}, {}) buffer={} -> {}x{}",
            image.id, image.band, region.lat, region.lon, region.buffer, rows, cols
        );

        let north = region.lat + half_lat;
        let west = region.lon - half_lon;
        let patch = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let lat = north - (r as f64 + 0.5) * pixel_height;
            let lon = wrap_longitude(west + (c as f64 + 0.5) * pixel_width);
            raster
                .value_at(lat, lon, image.resampling)
                .unwrap_or(default_value)
        });
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::service::WGS84;
    use ndarray::array;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn constant_raster(value: f64, pixel_deg: f64) -> GeoRaster {
        let rows = (180.0 / pixel_deg) as usize;
        let cols = (360.0 / pixel_deg) as usize;
        GeoRaster::new(
            Array2::from_elem((rows, cols), value),
            -180.0,
            90.0,
            pixel_deg,
            pixel_deg,
            pixel_deg * METERS_PER_DEGREE,
        )
    }

    /// Constant raster of `size` degrees square centred on (`lat`, `lon`).
    fn regional_raster(value: f64, pixel_deg: f64, lat: f64, lon: f64, size: f64) -> GeoRaster {
        let cells = (size / pixel_deg).ceil() as usize;
        GeoRaster::new(
            Array2::from_elem((cells, cells), value),
            lon - size / 2.0,
            lat + size / 2.0,
            pixel_deg,
            pixel_deg,
            pixel_deg * METERS_PER_DEGREE,
        )
    }

    #[test]
    fn first_picks_earliest_image_in_range() {
        let catalog = MemoryCatalog::new()
            .with_image("c", "b", ymd(2015, 3, 1), "band", constant_raster(2.0, 1.0))
            .with_image("c", "a", ymd(2015, 1, 1), "band", constant_raster(1.0, 1.0))
            .with_image("c", "z", ymd(2016, 1, 1), "band", constant_raster(3.0, 1.0));

        let q = ImageQuery::collection("c")
            .select("band")
            .filter_date(ymd(2015, 1, 1), ymd(2016, 1, 1));
        assert_eq!(catalog.first(&q).unwrap().id, "a");

        let march = q.clone().filter_date(ymd(2015, 3, 1), ymd(2015, 4, 1));
        assert_eq!(catalog.first(&march).unwrap().id, "b");

        let empty = q.filter_date(ymd(2017, 1, 1), ymd(2018, 1, 1));
        assert!(matches!(
            catalog.first(&empty),
            Err(SampleError::EmptyCollection { .. })
        ));
        assert!(matches!(
            catalog.first(&ImageQuery::collection("nope")),
            Err(SampleError::UnknownCollection(_))
        ));
        assert!(matches!(
            catalog.first(&ImageQuery::collection("c").select("other")),
            Err(SampleError::UnknownBand { .. })
        ));
    }

    #[test]
    fn sample_is_centred_and_filled_outside_extent() {
        // 2x2 degree raster covering lon 0..2, lat -1..1
        let raster = GeoRaster::new(array![[1.0, 2.0], [3.0, 4.0]], 0.0, 1.0, 1.0, 1.0, 111_320.0);
        let catalog = MemoryCatalog::new().with_image("c", "i", ymd(2015, 1, 1), "b", raster);
        let image = catalog.first(&ImageQuery::collection("c").select("b")).unwrap();

        // Buffer of one degree at the equator around the raster centre
        let patch = catalog
            .sample_rectangle(&image, &SampleRegion::new(0.0, 1.0, METERS_PER_DEGREE), -1.0)
            .unwrap();
        assert_eq!(patch.dim(), (2, 2));
        assert_eq!(patch, array![[1.0, 2.0], [3.0, 4.0]]);

        // Off the equator the longitude span widens past two pixels and the
        // extra column falls outside the raster
        let raster = GeoRaster::new(array![[1.0, 2.0], [3.0, 4.0]], 0.0, 2.0, 1.0, 1.0, 111_320.0);
        let shifted = MemoryCatalog::new().with_image("c", "i", ymd(2015, 1, 1), "b", raster);
        let patch = shifted
            .sample_rectangle(&image, &SampleRegion::new(1.0, 1.0, METERS_PER_DEGREE), -1.0)
            .unwrap();
        assert_eq!(patch, array![[1.0, 2.0, -1.0], [3.0, 4.0, -1.0]]);

        // Far away from the raster every cell takes the default
        let patch = catalog
            .sample_rectangle(&image, &SampleRegion::new(40.0, 40.0, METERS_PER_DEGREE), 17.0)
            .unwrap();
        assert!(patch.iter().all(|&v| v == 17.0));
    }

    #[test]
    fn masked_cells_take_default_value() {
        let raster = GeoRaster::new(array![[f64::NAN, 2.0]], 0.0, 1.0, 1.0, 1.0, 111_320.0);
        let catalog = MemoryCatalog::new().with_image("c", "i", ymd(2015, 1, 1), "b", raster);
        let image = catalog.first(&ImageQuery::collection("c").select("b")).unwrap();
        let patch = catalog
            .sample_rectangle(&image, &SampleRegion::new(0.5, 1.0, METERS_PER_DEGREE / 2.0), 0.0)
            .unwrap();
        assert_eq!(patch, array![[0.0, 2.0]]);
    }

    #[test]
    fn oversized_samples_exceed_pixel_budget() {
        // ~500 m pixels around the high-latitude point
        let catalog = MemoryCatalog::new().with_image(
            "c",
            "i",
            ymd(2015, 1, 1),
            "b",
            regional_raster(5.0, 0.0045, 60.0, 10.0, 4.0),
        );
        let image = catalog.first(&ImageQuery::collection("c").select("b")).unwrap();

        let small = SampleRegion::new(34.0, -118.0, 55_500.0);
        assert!(catalog.sample_rectangle(&image, &small, 0.0).is_ok());

        let high_latitude = SampleRegion::new(60.0, 10.0, 144_000.0);
        let err = catalog
            .sample_rectangle(&image, &high_latitude, 0.0)
            .unwrap_err();
        assert!(err.is_pixel_budget());

        // Shrinking to 40% fits again
        assert!(
            catalog
                .sample_rectangle(&image, &high_latitude.shrink(0.4), 0.0)
                .is_ok()
        );
    }

    #[test]
    fn reprojection_changes_output_grid() {
        let catalog = MemoryCatalog::new().with_image(
            "c",
            "i",
            ymd(2015, 1, 1),
            "b",
            regional_raster(5.0, 0.0045, 0.0, 0.0, 2.0),
        );
        let image = catalog
            .first(&ImageQuery::collection("c").select("b"))
            .unwrap()
            .resample(Resampling::Bilinear)
            .reproject(WGS84, 2000.0);
        let patch = catalog
            .sample_rectangle(&image, &SampleRegion::new(0.0, 0.0, 10_000.0), 0.0)
            .unwrap();
        assert_eq!(patch.dim(), (10, 10));
        assert!(patch.iter().all(|&v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let raster = GeoRaster::new(array![[0.0, 10.0]], 0.0, 1.0, 1.0, 1.0, 111_320.0);
        // exactly between the two pixel centres
        let v = raster.value_at(0.5, 1.0, Resampling::Bilinear).unwrap();
        assert!((v - 5.0).abs() < 1e-12);
        assert_eq!(raster.value_at(0.5, 1.0, Resampling::Nearest), Some(10.0));
        assert_eq!(raster.value_at(0.5, 5.0, Resampling::Bilinear), None);
    }

    #[test]
    fn longitudes_wrap_across_the_antimeridian() {
        assert_eq!(wrap_longitude(181.0), -179.0);
        assert_eq!(wrap_longitude(-181.0), 179.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(12.5), 12.5);
    }
}
