//! airgrid CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, generate the
//! run configuration, process every point and exit with appropriate status.
//! For programmatic use, prefer the library API (`airgrid::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
