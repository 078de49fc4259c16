//! Byte payloads as they appear inside stored documents.

use crate::base64::{base64_to_bytes, bytes_to_base64};
use crate::error::CodecResult;
use serde::{Deserialize, Serialize};

/// A byte payload embedded in a JSON document.
///
/// Current writers always produce [`EncodedBytes::Base64`]. Documents
/// written by older clients stored raw numeric arrays, which are still
/// accepted on read. Decoding is deferred to [`EncodedBytes::to_bytes`]
/// so that a damaged payload surfaces as a codec error the caller can
/// classify, instead of failing the whole document parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedBytes {
    /// Standard padded base64 text.
    Base64(String),
    /// Legacy array of byte values.
    Legacy(Vec<u8>),
}

impl EncodedBytes {
    /// Encodes raw bytes in the current (base64) form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Base64(bytes_to_base64(bytes))
    }

    /// Decodes the payload back to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a base64 payload is empty or malformed.
    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        match self {
            Self::Base64(text) => base64_to_bytes(text),
            Self::Legacy(bytes) => Ok(bytes.clone()),
        }
    }

    /// Returns true if the payload uses the legacy numeric-array form.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Length of the payload as stored (characters or array entries).
    #[must_use]
    pub fn stored_len(&self) -> usize {
        match self {
            Self::Base64(text) => text.len(),
            Self::Legacy(bytes) => bytes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_base64_form() {
        let encoded = EncodedBytes::from_bytes(&[1, 2, 3]);
        let json = serde_json::to_string(&encoded).unwrap();
        assert_eq!(json, "\"AQID\"");
    }

    #[test]
    fn reads_base64_form() {
        let parsed: EncodedBytes = serde_json::from_str("\"AQID\"").unwrap();
        assert!(!parsed.is_legacy());
        assert_eq!(parsed.to_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn reads_legacy_numeric_array() {
        let parsed: EncodedBytes = serde_json::from_str("[0, 127, 255]").unwrap();
        assert!(parsed.is_legacy());
        assert_eq!(parsed.to_bytes().unwrap(), vec![0, 127, 255]);
    }

    #[test]
    fn legacy_out_of_range_value_is_rejected() {
        let parsed: Result<EncodedBytes, _> = serde_json::from_str("[0, 256]");
        assert!(parsed.is_err());
    }

    #[test]
    fn damaged_base64_fails_lazily() {
        let parsed: EncodedBytes = serde_json::from_str("\"@@@\"").unwrap();
        assert!(parsed.to_bytes().is_err());
    }
}
