//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main":
//! parse the CLI, run the pipeline, print the run summary. Everything that
//! can fail does so through [`AppError`] so the binary maps it straight to
//! an exit code.

use clap::Parser;

use crate::cli::Cli;
use crate::error::AppError;
use crate::report::format_run_summary;

pub mod pipeline;

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    let config = Cli::parse().into_config();
    let summary = pipeline::run_pipeline(&config)?;
    print!("{}", format_run_summary(&summary));
    Ok(())
}
