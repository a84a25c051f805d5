//! CLI module for configbind
//!
//! Provides command-line interface for:
//! - get: Resolve field directives against files and the environment
//! - sources: Describe the registered sources

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, SourceArgs};
pub use commands::{build_sources, get, run_command, sources, DynamicConfig, DynamicField};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_json_to};

use crate::observability;

/// Parse arguments, start a runtime and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    observability::init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io_error(format!("failed to start runtime: {}", e)))?;
    runtime.block_on(run_command(cli.command))
}
