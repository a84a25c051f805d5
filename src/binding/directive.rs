//! Field directive parsing
//!
//! Syntax: `key[,required][,backend=NAME]`. The text before the first comma
//! is always the key, verbatim, even when it looks like an option.

use super::errors::{DirectiveError, DirectiveResult};

/// Key that flattens a structure into its parent, or skips a leaf
pub const FLATTEN: &str = "-";

const REQUIRED: &str = "required";
const BACKEND: &str = "backend=";

/// Binding specification derived from a directive string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSpec {
    pub key: String,
    pub required: bool,
    /// Name of the only source the field may be read from
    pub backend: Option<String>,
    /// Options that were neither `required` nor `backend=NAME`
    pub unrecognized: Vec<String>,
}

impl BindingSpec {
    /// Parses a directive, collecting malformed options in `unrecognized`
    pub fn parse(directive: &str) -> Self {
        let (key, options) = match directive.split_once(',') {
            Some((key, options)) => (key, Some(options)),
            None => (directive, None),
        };
        let mut spec = Self {
            key: key.to_string(),
            ..Self::default()
        };

        for option in options.into_iter().flat_map(|o| o.split(',')) {
            if option == REQUIRED {
                spec.required = true;
            } else if let Some(name) = option.strip_prefix(BACKEND).filter(|n| !n.is_empty()) {
                spec.backend = Some(name.to_string());
            } else {
                spec.unrecognized.push(option.to_string());
            }
        }
        spec
    }

    /// Parses a directive, rejecting malformed options
    pub fn parse_strict(directive: &str) -> DirectiveResult<Self> {
        let spec = Self::parse(directive);
        spec.ensure_recognized()?;
        Ok(spec)
    }

    /// Fails on the first malformed option
    pub fn ensure_recognized(&self) -> DirectiveResult<()> {
        match self.unrecognized.first() {
            Some(option) => Err(DirectiveError::UnknownOption(option.clone())),
            None => Ok(()),
        }
    }

    /// True for the flatten marker `-`
    pub fn is_flatten(&self) -> bool {
        self.key == FLATTEN
    }

    /// True when a leaf with this spec must never be written
    pub fn skips_leaf(&self) -> bool {
        self.key.is_empty() || self.is_flatten()
    }
}
