//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A base64 string could not be decoded.
    #[error("invalid base64 (length {length}): {message}")]
    InvalidBase64 {
        /// Length of the offending input in characters.
        length: usize,
        /// Description of the decoding error.
        message: String,
    },

    /// Failed to serialize a value to JSON.
    #[error("serialization failed: {message}")]
    SerializationFailed {
        /// Description of the serialization error.
        message: String,
    },

    /// Failed to parse JSON.
    #[error("deserialization failed: {message}")]
    DeserializationFailed {
        /// Description of the parse error.
        message: String,
    },
}

impl CodecError {
    /// Create an invalid base64 error.
    pub fn invalid_base64(length: usize, message: impl Into<String>) -> Self {
        Self::InvalidBase64 {
            length,
            message: message.into(),
        }
    }

    /// Create a serialization failed error.
    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::SerializationFailed {
            message: message.into(),
        }
    }

    /// Create a deserialization failed error.
    pub fn deserialization_failed(message: impl Into<String>) -> Self {
        Self::DeserializationFailed {
            message: message.into(),
        }
    }
}
