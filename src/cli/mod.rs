//! Command Line Interface (CLI) layer for airgrid.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`): validate flags into a run
//! configuration, sample every point of the region and save the batch.
//!
//! If you are embedding airgrid into another application, prefer using
//! the high-level `airgrid::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
