//! Command-line entry point for iaprofiler.
//!
//! Drives column-profiling workflows against a metadata catalog: asset
//! discovery, project maintenance, column analysis, status polling, result
//! publishing and ignore-list management.
//!
//! # Security Guarantees
//! - Passwords are never accepted as arguments and never logged
//! - Nothing is written to the catalog until discovery has completed

use clap::Parser;
use iaprofiler::{Cli, run};
use iaprofiler_core::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
