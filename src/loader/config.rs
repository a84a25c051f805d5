//! Loader configuration

use serde::{Deserialize, Serialize};

/// Loader tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Commands the loader task can queue before callers wait (default: 64)
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Fail a pass on malformed directive options instead of logging them
    /// (default: false)
    #[serde(default)]
    pub strict_directives: bool,
}

fn default_mailbox_capacity() -> usize {
    64
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            strict_directives: false,
        }
    }
}

impl LoaderConfig {
    /// Default config with strict directive checking
    pub fn strict() -> Self {
        Self {
            strict_directives: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.mailbox_capacity, 64);
        assert!(!config.strict_directives);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: LoaderConfig = serde_json::from_str(r#"{"strict_directives": true}"#).unwrap();
        assert_eq!(config, LoaderConfig::strict());

        let config: LoaderConfig = toml::from_str("mailbox_capacity = 8").unwrap();
        assert_eq!(config.mailbox_capacity, 8);
        assert!(!config.strict_directives);
    }
}
