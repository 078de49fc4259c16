//! Error types for the sync engine.

use budgetsync_codec::CodecError;
use budgetsync_crypto::CryptoError;
use budgetsync_protocol::TrackedField;
use budgetsync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A single item encodes to a document above the store ceiling.
    #[error("item in {field} encodes to {size} bytes, store limit is {limit}")]
    OversizedItem {
        /// Field holding the item.
        field: TrackedField,
        /// Encoded document size.
        size: usize,
        /// Store ceiling.
        limit: usize,
    },

    /// A chunk stayed above the store ceiling after bisection.
    #[error("chunk {chunk_id} is {size} bytes after bisection, store limit is {limit}")]
    OversizedChunk {
        /// Offending chunk (or "manifest").
        chunk_id: String,
        /// Encoded document size.
        size: usize,
        /// Store ceiling.
        limit: usize,
    },

    /// One generation needs more writes than the store accepts per commit.
    #[error("generation needs {operations} writes, store accepts {limit} per commit")]
    GenerationTooLarge {
        /// Chunk writes plus the manifest.
        operations: usize,
        /// Store batch ceiling.
        limit: usize,
    },

    /// The remote manifest was written under a different key.
    #[error("remote data is encrypted with a different key")]
    KeyMismatch,

    /// The manifest cannot be read and the cause cannot be established.
    #[error("manifest unreadable: {reason}")]
    ManifestUnreadable {
        /// What went wrong.
        reason: String,
    },

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Encryption error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine was given incomplete setup.
    #[error("engine not initialized: {0}")]
    NotInitialized(String),
}

impl SyncError {
    /// Creates a manifest unreadable error.
    pub fn manifest_unreadable(reason: impl Into<String>) -> Self {
        Self::ManifestUnreadable {
            reason: reason.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::from(StoreError::CommitFailed("aborted".into())).is_retryable());
        assert!(SyncError::from(StoreError::Unavailable("offline".into())).is_retryable());
        assert!(!SyncError::from(StoreError::Locked).is_retryable());
        assert!(!SyncError::KeyMismatch.is_retryable());
        assert!(!SyncError::OversizedItem {
            field: TrackedField::Bills,
            size: 2,
            limit: 1
        }
        .is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::OversizedItem {
            field: TrackedField::Transactions,
            size: 2_000_000,
            limit: 1_048_576,
        };
        let text = err.to_string();
        assert!(text.contains("transactions"));
        assert!(text.contains("2000000"));

        let err = SyncError::manifest_unreadable("legacy manifest");
        assert_eq!(err.to_string(), "manifest unreadable: legacy manifest");
    }
}
