//! Point processor: resolve, sample and reduce one point.
//!
//! Every dataset family shares one flow and differs only in its
//! [`FamilyProfile`] and reduction. Image resolution failures are returned to
//! the caller; sampling failures degrade to a 1×1 NaN patch so a single bad
//! point never aborts a batch.
pub mod family;

pub use family::FamilyProfile;

use ndarray::Array2;
use tracing::{debug, warn};

use crate::core::buffer::{needs_resampling, resampled_resolution};
use crate::core::geofence::Fence;
use crate::core::params::PointRequest;
use crate::core::record::{FeatureRecord, PointOutput, RawPatch};
use crate::error::Result;
use crate::io::service::{Image, ImageQuery, ImageryService, SampleRegion, WGS84};
use crate::types::AnalysisType;

/// Share of the buffer used for the single retry after a pixel-budget error.
pub const RETRY_BUFFER_FACTOR: f64 = 0.4;

/// Shape of the patch substituted for geofenced points.
pub const PLACEHOLDER_SHAPE: (usize, usize) = (2, 2);

fn nan_patch() -> Array2<f64> {
    Array2::from_elem((1, 1), f64::NAN)
}

/// Earliest image of the request's temporal window, resampled and
/// reprojected when the buffer would overflow the pixel budget at native
/// resolution.
pub fn resolve_image<S>(service: &S, req: &PointRequest, profile: &FamilyProfile) -> Result<Image>
where
    S: ImageryService + ?Sized,
{
    let query = ImageQuery::collection(req.collection.as_str())
        .select(req.band.as_str())
        .filter_window(req.window()?);
    let image = service.first(&query)?;

    if needs_resampling(req.buffer_size, req.resolution)? {
        let scale = resampled_resolution(req.buffer_size)?;
        debug!(
            "Resampling {} ({}) to {:.2} m for buffer {}",
            image.id, profile.resampling, scale, req.buffer_size
        );
        return Ok(image.resample(profile.resampling).reproject(WGS84, scale));
    }
    Ok(image)
}

/// Patch around the request's point: a placeholder when geofenced,
/// otherwise a sample with one shrunken retry on pixel-budget errors.
pub fn sample_patch<S>(
    service: &S,
    image: &Image,
    req: &PointRequest,
    profile: &FamilyProfile,
) -> Array2<f64>
where
    S: ImageryService + ?Sized,
{
    if let Some(fence) = profile.geofence.check(req.lat, req.lon) {
        match fence {
            Fence::Polar => debug!("({}, {}) is polar, using placeholder", req.lat, req.lon),
            Fence::OpenWater(region) => debug!(
                "({}, {}) is open water ({}), using placeholder",
                req.lat, req.lon, region
            ),
        }
        return Array2::from_elem(PLACEHOLDER_SHAPE, profile.default_value);
    }

    let region = SampleRegion::new(req.lat, req.lon, req.buffer_size);
    match service.sample_rectangle(image, &region, profile.default_value) {
        Ok(patch) => patch,
        Err(e) if e.is_pixel_budget() => {
            let smaller = region.shrink(RETRY_BUFFER_FACTOR);
            warn!(
                "({}, {}): {}; retrying with buffer {}",
                req.lat, req.lon, e, smaller.buffer
            );
            match service.sample_rectangle(image, &smaller, profile.default_value) {
                Ok(patch) => patch,
                Err(e) => {
                    warn!("({}, {}): retry failed: {}; using NaN", req.lat, req.lon, e);
                    nan_patch()
                }
            }
        }
        Err(e) => {
            warn!("({}, {}): {}; using NaN", req.lat, req.lon, e);
            nan_patch()
        }
    }
}

/// Reduce a patch into a feature record named after the request.
pub fn reduce(req: &PointRequest, patch: &Array2<f64>) -> FeatureRecord {
    let mut record = FeatureRecord::new(req.lat, req.lon);
    for (suffix, value) in req.family.reduce(patch) {
        record.insert(req.variable_name(suffix), value);
    }
    record
}

/// Run the whole flow for one point.
pub fn process_point<S>(service: &S, req: &PointRequest) -> Result<PointOutput>
where
    S: ImageryService + ?Sized,
{
    let profile = req.family.profile();
    let image = resolve_image(service, req, &profile)?;
    let patch = sample_patch(service, &image, req, &profile);

    Ok(match req.analysis {
        AnalysisType::Images => PointOutput::Image(RawPatch {
            lat: req.lat,
            lon: req.lon,
            year: req.year,
            dataset: req.dataset.clone(),
            band: req.band.clone(),
            data: patch,
        }),
        AnalysisType::Collection | AnalysisType::CollectionToar => {
            PointOutput::Features(reduce(req, &patch))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::max_allowable_buffer;
    use crate::io::service::SampleError;
    use crate::types::{Cadence, DatasetFamily, Month};
    use chrono::NaiveDate;
    use ndarray::array;
    use std::sync::Mutex;

    /// Scripted service: answers sample calls from a queue, then repeats the
    /// fallback patch.
    struct ScriptedService {
        resolve_fails: bool,
        responses: Mutex<Vec<std::result::Result<Array2<f64>, SampleError>>>,
        fallback: Array2<f64>,
        requests: Mutex<Vec<(Image, SampleRegion, f64)>>,
    }

    impl ScriptedService {
        fn returning(patch: Array2<f64>) -> Self {
            Self {
                resolve_fails: false,
                responses: Mutex::new(Vec::new()),
                fallback: patch,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn then(self, responses: Vec<std::result::Result<Array2<f64>, SampleError>>) -> Self {
            let mut reversed = responses;
            reversed.reverse();
            Self {
                responses: Mutex::new(reversed),
                ..self
            }
        }

        fn sampled(&self) -> Vec<(Image, SampleRegion, f64)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ImageryService for ScriptedService {
        fn first(&self, query: &ImageQuery) -> std::result::Result<Image, SampleError> {
            if self.resolve_fails {
                return Err(SampleError::UnknownCollection(query.collection.clone()));
            }
            Ok(Image::new(
                "img",
                query.collection.clone(),
                query.band.clone().unwrap_or_default(),
                query.start.unwrap_or(NaiveDate::MIN),
            ))
        }

        fn sample_rectangle(
            &self,
            image: &Image,
            region: &SampleRegion,
            default_value: f64,
        ) -> std::result::Result<Array2<f64>, SampleError> {
            self.requests
                .lock()
                .unwrap()
                .push((image.clone(), *region, default_value));
            match self.responses.lock().unwrap().pop() {
                Some(r) => r,
                None => Ok(self.fallback.clone()),
            }
        }
    }

    fn request(family: DatasetFamily, band: &str, lat: f64, lon: f64) -> PointRequest {
        PointRequest {
            lat,
            lon,
            family,
            dataset: family.dataset_name().to_string(),
            collection: "TEST/COLLECTION".to_string(),
            band: band.to_string(),
            cadence: Cadence::Yearly,
            year: 2015,
            month: Month::Jan,
            buffer_size: 10_000.0,
            resolution: 500.0,
            analysis: AnalysisType::Collection,
        }
    }

    fn budget() -> SampleError {
        SampleError::PixelBudgetExceeded {
            requested: 300_000,
            limit: 262_144,
        }
    }

    #[test]
    fn population_point_yields_summary_statistics() {
        let service = ScriptedService::returning(array![[1.0, 2.0], [3.0, 4.0]]);
        let req = request(DatasetFamily::Population, "population_density", 34.0, -118.0);
        let record = process_point(&service, &req).unwrap().into_features().unwrap();

        let names: Vec<&str> = record.variable_names().collect();
        assert_eq!(
            names,
            vec![
                "population.population_density.max",
                "population.population_density.mean",
                "population.population_density.min",
                "population.population_density.var",
            ]
        );
        assert_eq!(record.get("population.population_density.mean"), Some(2.5));
        assert_eq!(record.get("population.population_density.max"), Some(4.0));
        assert_eq!(record.get("population.population_density.min"), Some(1.0));
        assert_eq!(record.get("population.population_density.var"), Some(1.25));
        assert_eq!((record.lat, record.lon), (34.0, -118.0));

        let sampled = service.sampled();
        assert_eq!(sampled.len(), 1);
        assert_eq!(sampled[0].2, 0.0, "population fills with 0");
        assert_eq!(
            sampled[0].0.date,
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
        );
    }

    #[test]
    fn open_water_modis_point_uses_placeholder() {
        let service = ScriptedService::returning(array![[1.0]]);
        let req = request(DatasetFamily::Modis, "LC_Type1", -30.0, -150.0);
        let record = process_point(&service, &req).unwrap().into_features().unwrap();

        assert!(service.sampled().is_empty());
        assert_eq!(record.get("modis.LC_Type1.mode"), Some(17.0));
        assert_eq!(record.get("modis.LC_Type1.water_bds"), Some(1.0));
        assert_eq!(record.get("modis.LC_Type1.var"), Some(0.0));
        assert_eq!(record.len(), 19);
    }

    #[test]
    fn polar_point_only_fences_families_that_ask_for_it() {
        let service = ScriptedService::returning(array![[5.0]]);

        let night = request(DatasetFamily::Nightlight, "avg_rad", 85.0, 10.0);
        let record = process_point(&service, &night).unwrap().into_features().unwrap();
        assert_eq!(record.get("nightlight.avg_rad.mean"), Some(0.0));
        assert!(service.sampled().is_empty());

        // modis ignores the polar fence
        let modis = request(DatasetFamily::Modis, "LC_Type1", 85.0, 10.0);
        process_point(&service, &modis).unwrap();
        assert_eq!(service.sampled().len(), 1);
    }

    #[test]
    fn pixel_budget_retries_once_at_reduced_buffer() {
        let service =
            ScriptedService::returning(array![[7.0, 7.0]]).then(vec![Err(budget())]);
        let req = request(DatasetFamily::HumanModification, "gHM", 60.0, 10.0);
        let record = process_point(&service, &req).unwrap().into_features().unwrap();

        let buffers: Vec<f64> = service.sampled().iter().map(|s| s.1.buffer).collect();
        assert_eq!(buffers, vec![10_000.0, 4_000.0]);
        assert_eq!(record.get("global_human_modification.gHM.mean"), Some(7.0));
        assert_eq!(record.get("global_human_modification.gHM.mode"), Some(7.0));
    }

    #[test]
    fn failed_retry_yields_nan_features() {
        let service =
            ScriptedService::returning(array![[1.0]]).then(vec![Err(budget()), Err(budget())]);
        let req = request(DatasetFamily::Population, "population_density", 60.0, 10.0);
        let record = process_point(&service, &req).unwrap().into_features().unwrap();
        assert_eq!(service.sampled().len(), 2);
        assert!(record.values.values().all(|v| v.is_nan()));
    }

    #[test]
    fn other_sampling_failures_are_not_retried() {
        let service = ScriptedService::returning(array![[1.0]])
            .then(vec![Err(SampleError::Failed("timeout".into()))]);
        let req = request(DatasetFamily::Modis, "LC_Type1", 34.0, -118.0);
        let record = process_point(&service, &req).unwrap().into_features().unwrap();

        assert_eq!(service.sampled().len(), 1);
        assert!(record.get("modis.LC_Type1.mode").unwrap().is_nan());
        // the NaN cell matches no class
        assert_eq!(record.get("modis.LC_Type1.urban"), Some(0.0));
    }

    #[test]
    fn unresolvable_image_is_an_error() {
        let service = ScriptedService {
            resolve_fails: true,
            ..ScriptedService::returning(array![[1.0]])
        };
        let req = request(DatasetFamily::Fire, "LandCover", 34.0, -118.0);
        assert!(process_point(&service, &req).is_err());
        assert!(service.sampled().is_empty());
    }

    #[test]
    fn large_buffers_sample_a_reprojected_image() {
        let service = ScriptedService::returning(array![[3.0]]);
        let mut req = request(DatasetFamily::Modis, "LC_Type1", 34.0, -118.0);
        req.buffer_size = max_allowable_buffer(500.0).unwrap() + 1_000.0;
        process_point(&service, &req).unwrap();

        let (image, _, _) = &service.sampled()[0];
        let reprojection = image.reprojection.as_ref().unwrap();
        assert_eq!(reprojection.crs, WGS84);
        assert_eq!(
            reprojection.scale,
            resampled_resolution(req.buffer_size).unwrap()
        );
        assert_eq!(image.resampling, crate::types::Resampling::Nearest);

        // small buffers keep the native image
        let service = ScriptedService::returning(array![[3.0]]);
        req.buffer_size = 1_000.0;
        process_point(&service, &req).unwrap();
        assert!(service.sampled()[0].0.reprojection.is_none());
    }

    #[test]
    fn images_analysis_returns_raw_patch() {
        let patch = array![[1.0, 2.0], [3.0, 4.0]];
        let service = ScriptedService::returning(patch.clone());
        let mut req = request(DatasetFamily::Nightlight, "avg_rad", 34.0, -118.0);
        req.analysis = AnalysisType::Images;
        let raw = process_point(&service, &req).unwrap().into_image().unwrap();
        assert_eq!(raw.data, patch);
        assert_eq!(raw.year, 2015);
        assert_eq!(raw.band, "avg_rad");
    }

    #[test]
    fn monthly_requests_query_the_month() {
        let service = ScriptedService::returning(array![[1.0]]);
        let mut req = request(DatasetFamily::Nightlight, "avg_rad", 34.0, -118.0);
        req.cadence = Cadence::Monthly;
        req.month = Month::Feb;
        req.year = 2016;
        process_point(&service, &req).unwrap();
        assert_eq!(
            service.sampled()[0].0.date,
            NaiveDate::from_ymd_opt(2016, 2, 1).unwrap()
        );
    }
}
