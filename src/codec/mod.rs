//! Wire-format codecs
//!
//! A codec converts between raw bytes and the flat key -> raw value mapping a
//! source publishes, decodes single raw values into typed destinations, and
//! decodes raw values into nested mappings or lists of mappings.
//!
//! # Design
//!
//! - `RawValue` is meaningless without the codec of the snapshot it came from
//! - Nested values are normalised to a JSON tree, whatever the wire format
//! - Typed decoding goes through serde, so any `DeserializeOwned` type binds

mod errors;
mod json;
mod toml;
mod yaml;

pub use errors::{CodecError, CodecResult};
pub use json::JsonCodec;
pub use self::toml::TomlCodec;
pub use yaml::YamlCodec;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Flat key -> raw value mapping published by a source
pub type Data = BTreeMap<String, RawValue>;

/// A codec-specific value handle
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// An undecoded document or fragment in the codec's wire format
    Bytes(Vec<u8>),
    /// A bare string, e.g. an environment variable value
    Text(String),
    /// An already parsed value
    Tree(Value),
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Tree(value)
    }
}

/// Capability every wire format implements
pub trait Codec: Send + Sync + fmt::Debug {
    /// Format identifier ("json", "yaml", "toml")
    fn name(&self) -> &'static str;

    /// Writes a value in this format
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>>;

    /// Parses a document or fragment in this format
    fn parse(&self, bytes: &[u8]) -> CodecResult<Value>;

    /// Decodes a raw value into a neutral value tree
    fn decode_value(&self, raw: &RawValue) -> CodecResult<Value> {
        match raw {
            RawValue::Bytes(bytes) => self.parse(bytes),
            RawValue::Text(text) => Ok(Value::String(text.clone())),
            RawValue::Tree(value) => Ok(value.clone()),
        }
    }

    /// Decodes a raw value into a nested key -> raw value mapping
    fn decode_data(&self, raw: &RawValue) -> CodecResult<Data> {
        into_data(self.name(), self.structured(raw)?)
    }

    /// Decodes a raw value into a sequence of nested mappings
    fn decode_data_list(&self, raw: &RawValue) -> CodecResult<Vec<Data>> {
        into_data_list(self.name(), self.structured(raw)?)
    }

    /// Like `decode_value`, but parses text so strings holding a document
    /// can carry nested data
    fn structured(&self, raw: &RawValue) -> CodecResult<Value> {
        match raw {
            RawValue::Text(text) => self.parse(text.as_bytes()),
            other => self.decode_value(other),
        }
    }
}

impl<'c> dyn Codec + 'c {
    /// Decodes a raw value into `T`.
    ///
    /// Strings are weakly typed: they bind to string destinations as-is and
    /// are otherwise parsed as a fragment in this codec's format, so `"10"`
    /// binds to an integer and `"true"` to a bool.
    pub fn decode<T: DeserializeOwned>(&self, raw: &RawValue) -> CodecResult<T> {
        match self.decode_value(raw)? {
            Value::String(text) => match serde_json::from_value(Value::String(text.clone())) {
                Ok(value) => Ok(value),
                Err(as_string) => match self.parse(text.as_bytes()) {
                    Ok(parsed) => serde_json::from_value(parsed).map_err(|_| as_string.into()),
                    Err(_) => Err(as_string.into()),
                },
            },
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Encodes any serializable value in this codec's format
    pub fn encode_native<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        self.encode(&serde_json::to_value(value)?)
    }
}

/// Picks a codec from a file extension, defaulting to JSON
pub fn codec_for_path(path: &Path) -> Arc<dyn Codec> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Arc::new(YamlCodec),
        Some("toml") => Arc::new(TomlCodec),
        _ => Arc::new(JsonCodec),
    }
}

/// Converts a parsed mapping into `Data`. A null document is an empty mapping.
pub(crate) fn into_data(codec: &'static str, value: Value) -> CodecResult<Data> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, RawValue::Tree(value)))
            .collect()),
        Value::Null => Ok(Data::new()),
        other => Err(CodecError::UnexpectedShape {
            codec,
            expected: "mapping",
            found: kind_of(&other),
        }),
    }
}

pub(crate) fn into_data_list(codec: &'static str, value: Value) -> CodecResult<Vec<Data>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(_) => into_data(codec, item),
                other => Err(CodecError::UnexpectedShape {
                    codec,
                    expected: "list of mappings",
                    found: kind_of(&other),
                }),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(CodecError::UnexpectedShape {
            codec,
            expected: "list of mappings",
            found: kind_of(&other),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
