//! CLI argument definitions using clap
//!
//! Commands:
//! - configbind get --file <path> --env <prefix> --key <directive> [--watch]
//! - configbind sources --file <path> --env <prefix>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// configbind - bind configuration keys from files and the environment
#[derive(Parser, Debug)]
#[command(name = "configbind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Sources to register, in precedence order: files first, then environment
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Configuration file; codec picked from the extension (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Environment variables starting with PREFIX, prefix stripped (repeatable)
    #[arg(long = "env", value_name = "PREFIX")]
    pub env_prefixes: Vec<String>,

    /// Defaults file for environment variables (KEY=VALUE lines)
    #[arg(long = "env-defaults", value_name = "PATH")]
    pub env_defaults: Option<PathBuf>,

    /// Keep running and print a line after every change
    #[arg(long)]
    pub watch: bool,

    /// Polling period for watched sources, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Reject malformed directive options
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve directives and print the values as JSON
    Get {
        #[command(flatten)]
        sources: SourceArgs,

        /// Field directive, e.g. "db-host,required" (repeatable)
        #[arg(long = "key", value_name = "DIRECTIVE", required = true)]
        keys: Vec<String>,
    },

    /// Print the registered sources as JSON lines
    Sources {
        #[command(flatten)]
        sources: SourceArgs,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
