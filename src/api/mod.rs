//! High-level library API: turn a run configuration into point requests,
//! process them on a bounded worker pool with retry, and persist the batch.
//! Prefer these entrypoints over the low-level core modules when embedding
//! airgrid.
pub mod retry;

pub use retry::RetryPolicy;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::core::grid::{GriddedResult, add_time_dimension, merge};
use crate::core::params::PointRequest;
use crate::core::processor::process_point;
use crate::core::record::{FeatureRecord, PointOutput, RawPatch};
use crate::error::{Error, Result};
use crate::io::ImageryService;
use crate::io::writers::{patch_file_name, write_feature_table, write_gridded_json, write_patch_tiff};
use crate::types::{AnalysisType, Cadence};

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 25;

/// One request per point of the configured region.
pub fn build_requests(config: &RunConfig) -> Result<Vec<PointRequest>> {
    let family = config.dataset.family()?;
    Ok(config
        .region
        .points()
        .into_iter()
        .map(|(lat, lon)| PointRequest {
            lat,
            lon,
            family,
            dataset: config.dataset.name.clone(),
            collection: config.dataset.collection.clone(),
            band: config.band.clone(),
            cadence: config.dataset.t_cadence,
            year: config.query_year,
            month: config.query_month,
            buffer_size: config.buffer_size,
            resolution: config.dataset.resolution,
            analysis: config.analysis_type,
        })
        .collect())
}

/// Batch processing report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub errors: usize,
}

/// Outputs of a batch, in request order, with failed points left out.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub outputs: Vec<PointOutput>,
    pub report: BatchReport,
}

impl BatchOutcome {
    pub fn features(&self) -> Vec<FeatureRecord> {
        self.outputs
            .iter()
            .filter_map(|o| o.clone().into_features())
            .collect()
    }

    pub fn images(&self) -> Vec<RawPatch> {
        self.outputs
            .iter()
            .filter_map(|o| o.clone().into_image())
            .collect()
    }
}

/// Process every request on a pool of `workers` threads, each point wrapped
/// in `policy`. If `continue_on_error` is true, failed points are counted in
/// the report and left out; otherwise the first failure (in request order)
/// is returned once the batch has finished.
pub fn process_points<S>(
    service: &S,
    requests: &[PointRequest],
    workers: usize,
    policy: &RetryPolicy,
    continue_on_error: bool,
) -> Result<BatchOutcome>
where
    S: ImageryService + ?Sized,
{
    info!(
        "Processing {} points with {} workers",
        requests.len(),
        workers
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(Error::external)?;

    let results: Vec<Result<PointOutput>> = pool.install(|| {
        requests
            .par_iter()
            .map(|req| policy.run(|_| process_point(service, req)))
            .collect()
    });

    let mut outcome = BatchOutcome::default();
    for (req, result) in requests.iter().zip(results) {
        match result {
            Ok(output) => {
                outcome.report.processed += 1;
                outcome.outputs.push(output);
            }
            Err(e) => {
                warn!("Error processing ({}, {}): {}", req.lat, req.lon, e);
                outcome.report.errors += 1;
                if !continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    info!("Batch processing complete!");
    info!("Processed: {}", outcome.report.processed);
    info!("Errors: {}", outcome.report.errors);
    Ok(outcome)
}

/// Result of persisting a batch. Save failures are reported, not raised.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Saved(Vec<PathBuf>),
    Failed(String),
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved(_))
    }
}

fn time_tag(config: &RunConfig) -> &'static str {
    if config.add_time { "with_time" } else { "no_time" }
}

/// Base file name (no extension) of a batch's persisted result. Point tables
/// carry the band after the dataset name.
pub fn save_name(config: &RunConfig, with_band: bool) -> String {
    let name = if with_band {
        format!("{}_{}", config.dataset.name, config.band)
    } else {
        config.dataset.name.clone()
    };
    let when = match config.dataset.t_cadence {
        Cadence::Yearly => config.query_year.to_string(),
        Cadence::Monthly => format!("{}_{}", config.query_month, config.query_year),
    };
    format!(
        "{}_{}_{}_buffersize_{}_{}",
        name,
        when,
        config.region.extent,
        config.buffer_size,
        time_tag(config)
    )
}

fn attributes(config: &RunConfig) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    attrs.insert("dataset".to_string(), config.dataset.name.clone());
    attrs.insert("collection".to_string(), config.dataset.collection.clone());
    attrs.insert("band".to_string(), config.band.clone());
    attrs.insert("region".to_string(), config.region.extent.clone());
    attrs.insert("date".to_string(), config.date.to_string());
    attrs.insert("buffer_size".to_string(), config.buffer_size.to_string());
    attrs
}

/// Merge feature records, adding the time axis when configured.
pub fn grid_results(config: &RunConfig, records: &[FeatureRecord]) -> Result<GriddedResult> {
    let grid = merge(records)?;
    if config.add_time {
        return add_time_dimension(
            grid,
            config.dataset.t_cadence,
            config.query_year,
            config.query_month,
        );
    }
    Ok(grid)
}

fn save_collection(config: &RunConfig, outcome: &BatchOutcome, dir: &Path) -> Result<Vec<PathBuf>> {
    let grid = grid_results(config, &outcome.features())?;
    let attrs = attributes(config);
    let base = save_name(config, false);

    let json_path = dir.join(format!("{base}.json"));
    write_gridded_json(&grid, &attrs, &json_path)?;
    #[allow(unused_mut)]
    let mut saved = vec![json_path];

    #[cfg(feature = "gdal")]
    {
        let tif_path = dir.join(format!("{base}.tif"));
        crate::io::writers::write_gridded_gdal(&grid, &attrs, &tif_path)?;
        saved.push(tif_path);
    }
    Ok(saved)
}

fn save_table(config: &RunConfig, outcome: &BatchOutcome, dir: &Path) -> Result<Vec<PathBuf>> {
    let path = dir.join(format!("{}.csv", save_name(config, true)));
    write_feature_table(&outcome.features(), &path)?;
    Ok(vec![path])
}

fn save_images(outcome: &BatchOutcome, dir: &Path) -> Result<Vec<PathBuf>> {
    let patches = outcome.images();
    if patches.is_empty() {
        return Err(Error::EmptyBatch);
    }
    patches
        .iter()
        .map(|p| {
            let path = dir.join(patch_file_name(p));
            write_patch_tiff(p, &path)?;
            Ok(path)
        })
        .collect()
}

/// Persist a batch according to the configured analysis type.
pub fn save_results(config: &RunConfig, outcome: &BatchOutcome) -> SaveStatus {
    let dir = config.save_dir.as_path();
    let result = fs::create_dir_all(dir)
        .map_err(Error::from)
        .and_then(|()| match config.analysis_type {
            AnalysisType::Collection => save_collection(config, outcome, dir),
            AnalysisType::CollectionToar => save_table(config, outcome, dir),
            AnalysisType::Images => save_images(outcome, dir),
        });
    match result {
        Ok(paths) => {
            info!("Saved {} file(s) to {:?}", paths.len(), dir);
            SaveStatus::Saved(paths)
        }
        Err(e) => {
            error!("Save was unsuccessful: {}", e);
            SaveStatus::Failed(e.to_string())
        }
    }
}

/// Build requests, process them and persist the batch.
pub fn run_pipeline<S>(
    service: &S,
    config: &RunConfig,
    workers: usize,
    policy: &RetryPolicy,
    continue_on_error: bool,
) -> Result<(BatchOutcome, SaveStatus)>
where
    S: ImageryService + ?Sized,
{
    let requests = build_requests(config)?;
    let outcome = process_points(service, &requests, workers, policy, continue_on_error)?;
    let status = save_results(config, &outcome);
    Ok((outcome, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Region, RegionKind, builtin};
    use crate::io::service::{Image, ImageQuery, SampleError, SampleRegion};
    use crate::types::{DatasetFamily, Month};
    use chrono::NaiveDate;
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a patch whose value is the point's latitude; images at
    /// negative longitudes fail to resolve.
    struct LatitudeService {
        resolves: AtomicUsize,
    }

    impl ImageryService for LatitudeService {
        fn first(&self, query: &ImageQuery) -> std::result::Result<Image, SampleError> {
            self.resolves.fetch_add(1, Ordering::SeqCst);
            Ok(Image::new(
                "img",
                query.collection.clone(),
                query.band.clone().unwrap_or_default(),
                query.start.unwrap_or(NaiveDate::MIN),
            ))
        }

        fn sample_rectangle(
            &self,
            _image: &Image,
            region: &SampleRegion,
            _default_value: f64,
        ) -> std::result::Result<Array2<f64>, SampleError> {
            Ok(Array2::from_elem((2, 2), region.lat))
        }
    }

    fn config(dir: &Path, analysis: AnalysisType, kind: RegionKind) -> RunConfig {
        RunConfig {
            region: Region {
                extent: "mini_test".into(),
                kind,
                lats: vec![10.0, 12.0],
                lons: vec![-95.0, -92.5],
            },
            dataset: builtin(DatasetFamily::Population),
            band: "population_density".into(),
            date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            query_year: 2015,
            query_month: Month::Jan,
            analysis_type: analysis,
            buffer_size: 10_000.0,
            save_dir: dir.to_path_buf(),
            add_time: false,
        }
    }

    fn quick() -> RetryPolicy {
        RetryPolicy {
            tries: 2,
            delay: Duration::ZERO,
            backoff: 1.0,
        }
    }

    #[test]
    fn grid_regions_expand_to_cross_product() {
        let dir = tempfile::tempdir().unwrap();
        let reqs = build_requests(&config(dir.path(), AnalysisType::Collection, RegionKind::Grid))
            .unwrap();
        assert_eq!(reqs.len(), 4);
        assert_eq!((reqs[0].lat, reqs[0].lon), (10.0, -95.0));
        assert_eq!((reqs[1].lat, reqs[1].lon), (12.0, -95.0));
        assert_eq!(reqs[0].dataset, "population");
        assert_eq!(reqs[0].resolution, 927.67);

        let zipped =
            build_requests(&config(dir.path(), AnalysisType::Collection, RegionKind::Points))
                .unwrap();
        assert_eq!(zipped.len(), 2);
        assert_eq!((zipped[1].lat, zipped[1].lon), (12.0, -92.5));
    }

    #[test]
    fn batch_keeps_request_order() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), AnalysisType::Collection, RegionKind::Grid);
        let reqs = build_requests(&cfg).unwrap();
        let service = LatitudeService {
            resolves: AtomicUsize::new(0),
        };
        let outcome = process_points(&service, &reqs, 3, &quick(), true).unwrap();
        assert_eq!(outcome.report, BatchReport { processed: 4, errors: 0 });
        let lats: Vec<f64> = outcome.outputs.iter().map(|o| o.lat_lon().0).collect();
        assert_eq!(lats, vec![10.0, 12.0, 10.0, 12.0]);
        assert_eq!(service.resolves.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn failed_points_are_retried_then_counted() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), AnalysisType::Collection, RegionKind::Grid);
        let mut reqs = build_requests(&cfg).unwrap();
        // no calendar window for this year, fails before reaching the service
        reqs[0].year = i32::MAX;

        let service = LatitudeService {
            resolves: AtomicUsize::new(0),
        };
        let outcome = process_points(&service, &reqs, 2, &quick(), true).unwrap();
        assert_eq!(outcome.report.errors, 1);
        assert_eq!(outcome.report.processed, 3);
        assert!(process_points(&service, &reqs, 2, &quick(), false).is_err());
    }

    #[test]
    fn save_names_follow_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), AnalysisType::Collection, RegionKind::Grid);
        assert_eq!(
            save_name(&cfg, false),
            "population_2015_mini_test_buffersize_10000_no_time"
        );
        cfg.dataset.t_cadence = Cadence::Monthly;
        cfg.add_time = true;
        assert_eq!(
            save_name(&cfg, true),
            "population_population_density_jan_2015_mini_test_buffersize_10000_with_time"
        );
    }

    #[test]
    fn collection_batches_save_a_gridded_document() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), AnalysisType::Collection, RegionKind::Grid);
        let service = LatitudeService {
            resolves: AtomicUsize::new(0),
        };
        let (outcome, status) = run_pipeline(&service, &cfg, 2, &quick(), true).unwrap();
        assert_eq!(outcome.report.processed, 4);
        match status {
            SaveStatus::Saved(paths) => {
                assert!(paths[0].ends_with("population_2015_mini_test_buffersize_10000_no_time.json"));
                assert!(paths[0].exists());
            }
            SaveStatus::Failed(e) => panic!("save failed: {e}"),
        }
    }

    #[test]
    fn inconsistent_batches_report_failed_save() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), AnalysisType::CollectionToar, RegionKind::Points);
        let mut a = FeatureRecord::new(1.0, 1.0);
        a.insert("x".into(), 1.0);
        let b = FeatureRecord::new(2.0, 2.0);
        let outcome = BatchOutcome {
            outputs: vec![PointOutput::Features(a), PointOutput::Features(b)],
            report: BatchReport {
                processed: 2,
                errors: 0,
            },
        };
        assert!(matches!(save_results(&cfg, &outcome), SaveStatus::Failed(_)));
    }
}
