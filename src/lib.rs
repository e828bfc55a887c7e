#![doc = r#"
airgrid: gridded land-cover, fire, population and nightlight features from
georeferenced imagery collections.

For every point of a region, airgrid samples a square window of a satellite or
census image collection, reduces it to a fixed set of per-family statistics
(class coverage, burnt and built-up fractions, mean/max/min/variance) and merges
the per-point records into one gridded dataset. It powers the airgrid CLI and
can be embedded in your own Rust applications.

Stability
---------
The public library API is experimental in initial releases and may evolve as the
crate stabilizes. Breaking changes can occur.

Requirements
------------
- Rust 2024 edition toolchain.
- With the `gdal` feature: GDAL development headers and runtime.

Quick start: run a configured batch
-----------------------------------
```rust,no_run
use std::path::{Path, PathBuf};
use airgrid::api::{self, RetryPolicy, SaveStatus};
use airgrid::config::{ConfigRequest, generate_config};
use airgrid::io::load_catalog;
use airgrid::AnalysisType;

fn main() -> airgrid::Result<()> {
    let request = ConfigRequest {
        gee_data: "modis".to_string(),
        region: "mini_test".to_string(),
        date: "2015-01-01".to_string(),
        analysis_type: AnalysisType::Collection,
        add_time: false,
        buffer_size: "55500".into(),
        configs_dir: PathBuf::from("configs"),
        save_dir: PathBuf::from("output"),
        band: None,
    };
    let (config, _) = generate_config(&request)?;
    let catalog = load_catalog(Path::new("catalog/manifest.json"))?;

    let (outcome, status) =
        api::run_pipeline(&catalog, &config, 8, &RetryPolicy::default(), true)?;
    println!("processed={} errors={}", outcome.report.processed, outcome.report.errors);
    if let SaveStatus::Saved(paths) = status {
        println!("saved {:?}", paths);
    }
    Ok(())
}
```

Process single points against an in-memory catalog
---------------------------------------------------
```rust
use chrono::NaiveDate;
use ndarray::Array2;
use airgrid::core::params::PointRequest;
use airgrid::core::processor::process_point;
use airgrid::io::{GeoRaster, MemoryCatalog};
use airgrid::{AnalysisType, Cadence, DatasetFamily, Month};

fn main() -> airgrid::Result<()> {
    let catalog = MemoryCatalog::new().with_image(
        "CIESIN/GPWv411/GPW_Population_Density",
        "gpw_2015",
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
        "population_density",
        GeoRaster::global(Array2::from_elem((180, 360), 25.0)),
    );
    let request = PointRequest {
        lat: 48.0,
        lon: 11.0,
        family: DatasetFamily::Population,
        dataset: "population".to_string(),
        collection: "CIESIN/GPWv411/GPW_Population_Density".to_string(),
        band: "population_density".to_string(),
        cadence: Cadence::Yearly,
        year: 2015,
        month: Month::Jan,
        buffer_size: 100_000.0,
        resolution: 927.67,
        analysis: AnalysisType::Collection,
    };

    let record = process_point(&catalog, &request)?
        .into_features()
        .unwrap();
    assert_eq!(record.get("population.population_density.mean"), Some(25.0));
    Ok(())
}
```

Error handling
--------------
All public functions return `airgrid::Result<T>`; match on `airgrid::Error` to
handle specific cases, e.g. configuration or sampling errors.

```rust,no_run
use airgrid::config::{ConfigError, RunConfig};
use airgrid::Error;
use std::path::Path;

fn main() {
    match RunConfig::load(Path::new("configs/missing.json")).map_err(Error::from) {
        Ok(config) => println!("{} points", config.region.len()),
        Err(Error::Config(ConfigError::Io { path, .. })) => eprintln!("no config at {path:?}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Feature flags
-------------
- `gdal`: additionally writes gridded results as multi-band GeoTIFFs via GDAL.

Useful modules
--------------
- [`api`]: request building, batch processing and persistence.
- [`config`]: dataset table, regions, dates and run configuration files.
- [`core`]: buffer policy, geofences, taxonomies, reducers, point processor
  and result aggregation.
- [`io`]: the imagery service seam, the local catalog and writers.
- [`types`]: shared enums (e.g. `DatasetFamily`, `Cadence`, `AnalysisType`).
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::grid::GriddedResult;
pub use core::params::PointRequest;
pub use core::record::{FeatureRecord, PointOutput, RawPatch};
pub use error::{Error, Result};
pub use types::{AnalysisType, Cadence, DatasetFamily, Month, Resampling};

// Configuration
pub use config::{ConfigError, ConfigRequest, RunConfig, generate_config};

// Imagery
pub use io::{GeoRaster, ImageryService, MemoryCatalog, SampleError, load_catalog};

// High-level API re-exports
pub use api::{
    BatchOutcome, BatchReport, RetryPolicy, SaveStatus, build_requests, process_points,
    run_pipeline, save_results,
};
