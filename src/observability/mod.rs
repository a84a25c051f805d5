//! Observability for configbind
//!
//! Logging goes through `tracing`. This module fixes the event vocabulary and
//! provides the subscriber setup used by the command-line tool.
//!
//! # Usage
//!
//! ```ignore
//! use configbind::observability::Event;
//!
//! tracing::info!(event = %Event::SourceRegistered, source = "file", "source registered");
//! ```

mod events;

pub use events::Event;

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
