//! YAML codec
//!
//! YAML documents are read into the same JSON value tree the other codecs
//! produce, so mappings decoded from YAML bind exactly like JSON ones.

use serde_json::Value;

use super::{Codec, CodecError, CodecResult};

/// YAML wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| CodecError::encode(self.name(), e))
    }

    fn parse(&self, bytes: &[u8]) -> CodecResult<Value> {
        serde_yaml::from_slice(bytes).map_err(|e| CodecError::parse(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawValue;
    use serde_json::json;
    use std::sync::Arc;

    fn codec() -> Arc<dyn Codec> {
        Arc::new(YamlCodec)
    }

    #[test]
    fn test_nested_document() {
        let codec = codec();
        let raw = RawValue::Bytes(b"int: 10\nstring: string\nnested:\n  key: nested key\n".to_vec());
        let data = codec.decode_data(&raw).unwrap();
        assert_eq!(data["int"], RawValue::Tree(json!(10)));
        let nested = codec.decode_data(&data["nested"]).unwrap();
        let key: String = codec.decode(&nested["key"]).unwrap();
        assert_eq!(key, "nested key");
    }

    #[test]
    fn test_sequence_of_mappings() {
        let codec = codec();
        let raw = RawValue::Bytes(b"- host: a\n  port: 1\n- host: b\n  port: 2\n".to_vec());
        let list = codec.decode_data_list(&raw).unwrap();
        assert_eq!(list.len(), 2);
        let port: u16 = codec.decode(&list[1]["port"]).unwrap();
        assert_eq!(port, 2);
    }

    #[test]
    fn test_scalars_round_trip() {
        let codec = codec();
        for value in [i64::MIN, -1, 0, i64::MAX] {
            let bytes = codec.encode_native(&value).unwrap();
            let decoded: i64 = codec.decode(&RawValue::Bytes(bytes)).unwrap();
            assert_eq!(decoded, value);
        }
        let bytes = codec.encode_native("plain text").unwrap();
        let decoded: String = codec.decode(&RawValue::Bytes(bytes)).unwrap();
        assert_eq!(decoded, "plain text");
    }

    #[test]
    fn test_text_fragment_is_weakly_typed() {
        let codec = codec();
        let value: u32 = codec.decode(&RawValue::Text("42".into())).unwrap();
        assert_eq!(value, 42);
    }
}
