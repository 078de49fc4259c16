//! Serialized size estimation and JSON helpers.
//!
//! The size of a value is the UTF-8 byte length of its `serde_json`
//! serialization. Chunk boundaries and the final pre-write size check
//! are both expressed in this unit.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Returns the serialized byte size of `value`.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized (for example a map
/// with non-string keys).
pub fn estimate_size<T: Serialize + ?Sized>(value: &T) -> CodecResult<usize> {
    // A counting writer avoids holding a second copy of large payloads.
    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, value)
        .map_err(|e| CodecError::serialization_failed(e.to_string()))?;
    Ok(counter.0)
}

/// Serializes `value` to JSON bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn to_json_vec<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CodecError::serialization_failed(e.to_string()))
}

/// Parses JSON bytes into `T`.
///
/// # Errors
///
/// Returns an error if the bytes are not valid JSON for `T`.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::deserialization_failed(e.to_string()))
}

struct ByteCounter(usize);

impl std::io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn size_matches_serialized_length() {
        let value = json!({"payee": "Grocer", "amount": -42.5, "tags": ["food"]});
        let bytes = to_json_vec(&value).unwrap();
        assert_eq!(estimate_size(&value).unwrap(), bytes.len());
    }

    #[test]
    fn size_counts_utf8_bytes_not_chars() {
        // "é" is two bytes in UTF-8, plus two quote characters.
        assert_eq!(estimate_size("é").unwrap(), 4);
        assert_eq!(estimate_size("€").unwrap(), 5);
    }

    #[test]
    fn empty_array_size() {
        let empty: Vec<u32> = Vec::new();
        assert_eq!(estimate_size(&empty).unwrap(), 2);
    }

    #[test]
    fn non_string_map_keys_fail() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1u8);
        assert!(matches!(
            estimate_size(&map),
            Err(CodecError::SerializationFailed { .. })
        ));
    }

    #[test]
    fn parse_error_is_reported() {
        let result: CodecResult<serde_json::Value> = from_json_slice(b"{not json");
        assert!(matches!(result, Err(CodecError::DeserializationFailed { .. })));
    }
}
