//! TOML codec
//!
//! TOML has no standalone scalar documents, so a fragment that does not parse
//! as a document is retried as the right-hand side of an assignment.

use serde_json::Value;

use super::{Codec, CodecError, CodecResult};

const FRAGMENT_KEY: &str = "value";

/// TOML wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        ::toml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| CodecError::encode(self.name(), e))
    }

    fn parse(&self, bytes: &[u8]) -> CodecResult<Value> {
        let text = std::str::from_utf8(bytes).map_err(|e| CodecError::parse(self.name(), e))?;
        match ::toml::from_str::<Value>(text) {
            Ok(document) => Ok(document),
            Err(document_err) => {
                let fragment = format!("{} = {}", FRAGMENT_KEY, text.trim());
                match ::toml::from_str::<Value>(&fragment) {
                    Ok(Value::Object(mut table)) => table
                        .remove(FRAGMENT_KEY)
                        .ok_or_else(|| CodecError::parse(self.name(), &document_err)),
                    _ => Err(CodecError::parse(self.name(), document_err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawValue;
    use serde_json::json;
    use std::sync::Arc;

    fn codec() -> Arc<dyn Codec> {
        Arc::new(TomlCodec)
    }

    #[test]
    fn test_nested_table() {
        let codec = codec();
        let raw = RawValue::Bytes(
            b"int = 10\nstring = \"string\"\n[nested]\n  key = \"nested key\"\n".to_vec(),
        );
        let data = codec.decode_data(&raw).unwrap();
        let int: i32 = codec.decode(&data["int"]).unwrap();
        assert_eq!(int, 10);
        let nested = codec.decode_data(&data["nested"]).unwrap();
        assert_eq!(nested["key"], RawValue::Tree(json!("nested key")));
    }

    #[test]
    fn test_array_of_tables() {
        let codec = codec();
        let raw = RawValue::Bytes(b"[[servers]]\nhost = \"a\"\n[[servers]]\nhost = \"b\"\n".to_vec());
        let data = codec.decode_data(&raw).unwrap();
        let servers = codec.decode_data_list(&data["servers"]).unwrap();
        assert_eq!(servers.len(), 2);
    }

    #[test]
    fn test_scalar_fragment() {
        let codec = codec();
        assert_eq!(codec.parse(b"10").unwrap(), json!(10));
        assert_eq!(codec.parse(b"\"text\"").unwrap(), json!("text"));
        let port: u16 = codec.decode(&RawValue::Text("8080".into())).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_table_round_trip() {
        let codec = codec();
        let value = json!({"name": "x", "limits": {"max": i64::MAX}});
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.parse(&bytes).unwrap(), value);
    }

    #[test]
    fn test_encode_scalar_fails() {
        let err = codec().encode(&json!(1)).unwrap_err();
        assert_eq!(err.code(), "CODEC_ENCODE_FAILED");
    }

    #[test]
    fn test_invalid_document() {
        let err = codec().parse(b"[unterminated").unwrap_err();
        assert_eq!(err.code(), "CODEC_PARSE_FAILED");
    }
}
