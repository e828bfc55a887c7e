use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Save was unsuccessful: {reason}")]
    SaveFailed { reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] airgrid::config::ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] airgrid::io::CatalogError),
}
