//! JSON codec

use serde_json::Value;

use super::{Codec, CodecError, CodecResult};

/// JSON wire format, the default codec of every source
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CodecError::encode(self.name(), e))
    }

    fn parse(&self, bytes: &[u8]) -> CodecResult<Value> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::parse(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawValue;
    use std::sync::Arc;

    fn codec() -> Arc<dyn Codec> {
        Arc::new(JsonCodec)
    }

    fn round_trip<T>(value: T) -> T
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let codec = codec();
        let bytes = codec.encode_native(&value).unwrap();
        codec.decode(&RawValue::Bytes(bytes)).unwrap()
    }

    #[test]
    fn test_integer_boundaries_round_trip() {
        assert_eq!(round_trip(i8::MIN), i8::MIN);
        assert_eq!(round_trip(i8::MAX), i8::MAX);
        assert_eq!(round_trip(i16::MAX), i16::MAX);
        assert_eq!(round_trip(i32::MIN), i32::MIN);
        assert_eq!(round_trip(i64::MIN), i64::MIN);
        assert_eq!(round_trip(i64::MAX), i64::MAX);
        assert_eq!(round_trip(u8::MAX), u8::MAX);
        assert_eq!(round_trip(u16::MAX), u16::MAX);
        assert_eq!(round_trip(u32::MAX), u32::MAX);
        assert_eq!(round_trip(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_float_boundaries_round_trip() {
        assert_eq!(round_trip(f32::MAX), f32::MAX);
        assert_eq!(round_trip(f64::MAX), f64::MAX);
        assert_eq!(round_trip(f64::MIN_POSITIVE), f64::MIN_POSITIVE);
    }

    #[test]
    fn test_strings_and_bools_round_trip() {
        assert_eq!(round_trip("quoted \"value\"".to_string()), "quoted \"value\"");
        assert!(round_trip(true));
        assert_eq!(round_trip(Some(3u8)), Some(3));
    }

    #[test]
    fn test_decode_data_from_document() {
        let codec = codec();
        let raw = RawValue::Bytes(br#"{"name":"x","nested":{"key":"v"}}"#.to_vec());
        let data = codec.decode_data(&raw).unwrap();
        let nested = codec.decode_data(&data["nested"]).unwrap();
        let key: String = codec.decode(&nested["key"]).unwrap();
        assert_eq!(key, "v");
    }

    #[test]
    fn test_parse_error() {
        let err = codec().parse(b"{").unwrap_err();
        assert_eq!(err.code(), "CODEC_PARSE_FAILED");
        assert!(err.to_string().starts_with("json: parse error"));
    }
}
