//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::binding::ResolveError;
use crate::loader::LoaderError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// A source could not be registered
    SourceFailed,
    /// A resolution pass failed
    ResolveFailed,
    /// The loader stopped unexpectedly
    LoaderFailed,
    /// I/O error (stdout, runtime setup)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceFailed => "CLI_SOURCE_FAILED",
            Self::ResolveFailed => "CLI_RESOLVE_FAILED",
            Self::LoaderFailed => "CLI_LOADER_FAILED",
            Self::IoError => "CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Resolution failure
    pub fn resolve_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ResolveFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        match e {
            LoaderError::Source(_) | LoaderError::Sources(_) => {
                Self::new(CliErrorCode::SourceFailed, e.to_string())
            }
            LoaderError::Closed | LoaderError::NoRuntime => {
                Self::new(CliErrorCode::LoaderFailed, e.to_string())
            }
        }
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        Self::resolve_failed(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
