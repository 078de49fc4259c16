//! Byte buffer <-> base64 conversion.
//!
//! Encoding is done in a single allocation-based pass, so buffers of
//! several megabytes (large encrypted transaction histories) encode
//! without any per-byte recursion.

use crate::error::{CodecError, CodecResult};
use data_encoding::BASE64;

/// Encodes bytes as standard padded base64.
#[must_use]
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decodes a standard padded base64 string.
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase64`] if the input is empty or is not
/// valid base64.
pub fn base64_to_bytes(encoded: &str) -> CodecResult<Vec<u8>> {
    if encoded.is_empty() {
        return Err(CodecError::invalid_base64(0, "empty input"));
    }
    BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| CodecError::invalid_base64(encoded.len(), e.to_string()))
}
