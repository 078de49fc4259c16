//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during encryption or decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material has the wrong length.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Actual length supplied.
        actual: usize,
        /// Required length.
        expected: usize,
    },

    /// IV has the wrong length.
    #[error("invalid IV size: expected {expected} bytes, got {actual}")]
    InvalidIvSize {
        /// Actual length supplied.
        actual: usize,
        /// Required length.
        expected: usize,
    },

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Error details.
        message: String,
    },

    /// Decryption or authentication failed.
    ///
    /// With an authenticated cipher this covers both a wrong key and a
    /// tampered ciphertext; the two cannot be told apart here.
    #[error("decryption failed: {message}")]
    DecryptionFailed {
        /// Error details.
        message: String,
    },

    /// Key derivation failed.
    #[error("key derivation failed: {message}")]
    KeyDerivationFailed {
        /// Error details.
        message: String,
    },
}

impl CryptoError {
    /// Creates an invalid key size error.
    pub fn invalid_key_size(actual: usize, expected: usize) -> Self {
        Self::InvalidKeySize { actual, expected }
    }

    /// Creates an invalid IV size error.
    pub fn invalid_iv_size(actual: usize, expected: usize) -> Self {
        Self::InvalidIvSize { actual, expected }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a decryption failed error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a key derivation failed error.
    pub fn key_derivation_failed(message: impl Into<String>) -> Self {
        Self::KeyDerivationFailed {
            message: message.into(),
        }
    }
}
