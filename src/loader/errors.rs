//! Loader error types

use thiserror::Error;

use crate::source::SourceError;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Loader errors
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A source failed to read or watch; surfaced unchanged
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Several sources failed to register
    #[error("source loading errors: {}", join_errors(.0))]
    Sources(Vec<SourceError>),

    /// The loader was shut down or its task is gone
    #[error("loader is closed")]
    Closed,

    /// The loader was created outside a tokio runtime
    #[error("loader requires a tokio runtime")]
    NoRuntime,
}

fn join_errors(errors: &[SourceError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl LoaderError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Source(e) => e.code(),
            Self::Sources(_) => "LOADER_SOURCES_FAILED",
            Self::Closed => "LOADER_CLOSED",
            Self::NoRuntime => "LOADER_NO_RUNTIME",
        }
    }
}
