use clap::Parser;
use std::path::PathBuf;

use airgrid::AnalysisType;
use airgrid::api::DEFAULT_WORKERS;

#[derive(Parser)]
#[command(name = "airgrid", version, about = "airgrid CLI")]
pub struct CliArgs {
    /// Dataset to sample (modis, fire, population, nightlight,
    /// human_settlement_layer_built_up, global_human_modification)
    #[arg(long = "gee_data")]
    pub gee_data: String,

    /// Named region (globe, europe, asia, australia, north_america,
    /// west_europe, east_europe, west_north_america, east_north_america,
    /// mini_test), toar2, or a path to a `{lats, lons}` JSON file
    #[arg(long)]
    pub region: String,

    /// Query date, YYYY-MM-DD
    #[arg(long)]
    pub date: String,

    /// What to produce per point
    #[arg(long = "analysis_type", value_enum, default_value_t = AnalysisType::Collection)]
    pub analysis_type: AnalysisType,

    /// Expand gridded results along a daily time axis (y/yes/true or n/no/false)
    #[arg(long = "add_time", default_value = "n")]
    pub add_time: String,

    /// Buffer radius around each point, in metres
    #[arg(long = "buffer_size")]
    pub buffer_size: String,

    /// Directory holding dataset, region and generated run configs
    #[arg(long = "configs_dir", default_value = "configs")]
    pub configs_dir: PathBuf,

    /// Directory for saved results
    #[arg(long = "save_dir", default_value = "output")]
    pub save_dir: PathBuf,

    /// Band to sample; defaults to the dataset's default band
    #[arg(long)]
    pub band: Option<String>,

    /// Manifest of local GeoTIFF collections to sample from
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Continue with the remaining points when a point fails
    #[arg(long = "skip_failed", default_value_t = false)]
    pub skip_failed: bool,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
