//! Binding error types
//!
//! A resolution pass reports at most one error:
//! - a fatal error (`RequiredMissing`, `UnknownBackend`, `InvalidDirective`)
//!   when any occurred, the first one in field order
//! - otherwise every per-field decode failure, aggregated

use thiserror::Error;

/// Result type for directive parsing
pub type DirectiveResult<T> = Result<T, DirectiveError>;

/// Result type for a resolution pass
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Malformed field directives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// An option is neither `required` nor `backend=NAME`
    #[error("unrecognized directive option '{0}'")]
    UnknownOption(String),
}

impl DirectiveError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownOption(_) => "DIRECTIVE_UNKNOWN_OPTION",
        }
    }
}

/// A found value that could not be converted into its field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' (key '{key}', source '{origin}'): {message}")]
pub struct FieldError {
    /// Dotted path of the field, e.g. `Servers[1].Host`
    pub field: String,
    pub key: String,
    /// Name of the source the value came from
    pub origin: String,
    pub message: String,
}

/// Outcome of a failed resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("required key '{key}' for field '{field}' not found")]
    RequiredMissing { key: String, field: String },

    #[error("the backend: '{backend}' is not registered")]
    UnknownBackend { backend: String, field: String },

    #[error("field '{field}': {error}")]
    InvalidDirective {
        field: String,
        #[source]
        error: DirectiveError,
    },

    #[error("data loading errors: {}", join_errors(.0))]
    Aggregate(Vec<FieldError>),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl ResolveError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequiredMissing { .. } => "RESOLVE_REQUIRED_MISSING",
            Self::UnknownBackend { .. } => "RESOLVE_UNKNOWN_BACKEND",
            Self::InvalidDirective { .. } => "RESOLVE_INVALID_DIRECTIVE",
            Self::Aggregate(_) => "RESOLVE_DECODE_FAILED",
        }
    }

    /// Returns true for errors that pre-empt decode errors
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Aggregate(_))
    }

    /// Returns the per-field decode failures, empty for fatal errors
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Aggregate(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_error(field: &str) -> FieldError {
        FieldError {
            field: field.into(),
            key: "age".into(),
            origin: "file".into(),
            message: "invalid type".into(),
        }
    }

    #[test]
    fn test_required_message() {
        let err = ResolveError::RequiredMissing {
            key: "name".into(),
            field: "Name".into(),
        };
        assert_eq!(err.to_string(), "required key 'name' for field 'Name' not found");
        assert_eq!(err.code(), "RESOLVE_REQUIRED_MISSING");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_backend_message() {
        let err = ResolveError::UnknownBackend {
            backend: "store".into(),
            field: "Name".into(),
        };
        assert_eq!(err.to_string(), "the backend: 'store' is not registered");
    }

    #[test]
    fn test_aggregate_joins_lines() {
        let err = ResolveError::Aggregate(vec![field_error("Age"), field_error("Db.Age")]);
        assert_eq!(
            err.to_string(),
            "data loading errors: field 'Age' (key 'age', source 'file'): invalid type\n\
             field 'Db.Age' (key 'age', source 'file'): invalid type"
        );
        assert!(!err.is_fatal());
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn test_invalid_directive_chains_source() {
        let err = ResolveError::InvalidDirective {
            field: "Name".into(),
            error: DirectiveError::UnknownOption("rrequiredd".into()),
        };
        assert_eq!(
            err.to_string(),
            "field 'Name': unrecognized directive option 'rrequiredd'"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
