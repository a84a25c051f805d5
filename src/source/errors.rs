//! Source adapter error types
//!
//! Adapter errors are surfaced unchanged by `Loader::register_source`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Source adapter errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// A file source was created with an empty path
    #[error("path not set")]
    PathNotSet,

    /// Reading or inspecting a file failed
    #[error("{}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    /// The source's codec rejected its content
    #[error("source '{name}': {error}")]
    Codec {
        name: String,
        #[source]
        error: CodecError,
    },

    /// A key-value prefix has no entries
    #[error("source not found: {0}")]
    NotFound(String),

    /// A line of an environment defaults file does not parse
    #[error("{}: invalid defaults entry '{line}'", .path.display())]
    InvalidDefaults { path: PathBuf, line: String },

    /// Watching needs a tokio runtime and none is running
    #[error("watching source '{0}' requires a tokio runtime")]
    NoRuntime(String),

    /// Adapter-specific failure
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Create a codec error for the named source
    pub fn codec(name: impl Into<String>, error: CodecError) -> Self {
        Self::Codec {
            name: name.into(),
            error,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathNotSet => "SOURCE_PATH_NOT_SET",
            Self::Io { .. } => "SOURCE_IO_FAILED",
            Self::Codec { .. } => "SOURCE_DECODE_FAILED",
            Self::NotFound(_) => "SOURCE_NOT_FOUND",
            Self::InvalidDefaults { .. } => "SOURCE_INVALID_DEFAULTS",
            Self::NoRuntime(_) => "SOURCE_NO_RUNTIME",
            Self::Other(_) => "SOURCE_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SourceError::PathNotSet.to_string(), "path not set");
        assert_eq!(
            SourceError::NotFound("app/".into()).to_string(),
            "source not found: app/"
        );
        let err = SourceError::InvalidDefaults {
            path: PathBuf::from("/etc/app.env"),
            line: "not an assignment".into(),
        };
        assert_eq!(
            err.to_string(),
            "/etc/app.env: invalid defaults entry 'not an assignment'"
        );
        assert_eq!(err.code(), "SOURCE_INVALID_DEFAULTS");
    }

    #[test]
    fn test_io_keeps_source() {
        use std::error::Error;
        let err = SourceError::io("missing.json", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.source().is_some());
        assert_eq!(err.code(), "SOURCE_IO_FAILED");
    }
}
