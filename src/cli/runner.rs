use tracing::info;
use tracing_subscriber::EnvFilter;

use airgrid::api::{self, RetryPolicy, SaveStatus};
use airgrid::config::{ConfigRequest, generate_config, parse_add_time};
use airgrid::io::load_catalog;

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("airgrid=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        init_logging();
    }

    let request = ConfigRequest {
        gee_data: args.gee_data,
        region: args.region,
        date: args.date,
        analysis_type: args.analysis_type,
        add_time: parse_add_time(&args.add_time).map_err(AppError::from)?,
        buffer_size: args.buffer_size.into(),
        configs_dir: args.configs_dir,
        save_dir: args.save_dir,
        band: args.band,
    };
    let (config, config_path) = generate_config(&request).map_err(AppError::from)?;
    info!("Using run config {:?}", config_path);

    let catalog_path = args.catalog.ok_or(AppError::MissingArgument {
        arg: "--catalog".to_string(),
    })?;
    let catalog = load_catalog(&catalog_path).map_err(AppError::from)?;
    info!(
        "Loaded {} image(s) of {} from {:?}",
        catalog.image_count(&config.dataset.collection),
        config.dataset.collection,
        catalog_path
    );

    let (outcome, status) = api::run_pipeline(
        &catalog,
        &config,
        args.workers,
        &RetryPolicy::default(),
        args.skip_failed,
    )?;

    match status {
        SaveStatus::Saved(paths) => {
            for path in &paths {
                info!("Successfully saved: {:?}", path);
            }
            info!(
                "{} point(s) processed, {} failed",
                outcome.report.processed, outcome.report.errors
            );
            Ok(())
        }
        SaveStatus::Failed(reason) => Err(AppError::SaveFailed { reason }.into()),
    }
}
