//! Codec error types
//!
//! Error codes:
//! - CODEC_PARSE_FAILED
//! - CODEC_ENCODE_FAILED
//! - CODEC_CONVERT_FAILED
//! - CODEC_UNEXPECTED_SHAPE

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while converting between wire formats and values
#[derive(Debug, Error)]
pub enum CodecError {
    /// Raw bytes are not a valid document in the codec's format
    #[error("{codec}: parse error: {message}")]
    Parse {
        codec: &'static str,
        message: String,
    },

    /// A value could not be written in the codec's format
    #[error("{codec}: encode error: {message}")]
    Encode {
        codec: &'static str,
        message: String,
    },

    /// A parsed value does not fit the destination type
    #[error("{0}")]
    Convert(#[from] serde_json::Error),

    /// A value has the wrong structure (e.g. a scalar where a mapping is needed)
    #[error("{codec}: expected {expected}, found {found}")]
    UnexpectedShape {
        codec: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl CodecError {
    /// Create a parse error
    pub fn parse(codec: &'static str, message: impl ToString) -> Self {
        Self::Parse {
            codec,
            message: message.to_string(),
        }
    }

    /// Create an encode error
    pub fn encode(codec: &'static str, message: impl ToString) -> Self {
        Self::Encode {
            codec,
            message: message.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "CODEC_PARSE_FAILED",
            Self::Encode { .. } => "CODEC_ENCODE_FAILED",
            Self::Convert(_) => "CODEC_CONVERT_FAILED",
            Self::UnexpectedShape { .. } => "CODEC_UNEXPECTED_SHAPE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CodecError::parse("json", "eof").code(), "CODEC_PARSE_FAILED");
        assert_eq!(CodecError::encode("toml", "bad").code(), "CODEC_ENCODE_FAILED");
        let shape = CodecError::UnexpectedShape {
            codec: "yaml",
            expected: "mapping",
            found: "list",
        };
        assert_eq!(shape.code(), "CODEC_UNEXPECTED_SHAPE");
        assert_eq!(shape.to_string(), "yaml: expected mapping, found list");
    }
}
