//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A document exceeds the store's hard size ceiling.
    #[error("document {path} is {size} bytes, store limit is {limit}")]
    DocumentTooLarge {
        /// Path of the rejected document.
        path: String,
        /// Serialized size of the document.
        size: usize,
        /// The store's per-document ceiling.
        limit: usize,
    },

    /// A batch holds more operations than the store accepts in one commit.
    #[error("batch has {ops} operations, store limit is {limit}")]
    BatchTooLarge {
        /// Number of staged operations.
        ops: usize,
        /// Maximum operations per commit.
        limit: usize,
    },

    /// A path is malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A batch commit was rejected; nothing from the batch was applied.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// The store is temporarily unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Persisted store data is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// A document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::CommitFailed(_) | StoreError::Unavailable(_) | StoreError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(StoreError::CommitFailed("aborted".into()).is_transient());
        assert!(StoreError::Unavailable("offline".into()).is_transient());
        assert!(!StoreError::Locked.is_transient());
        assert!(!StoreError::DocumentTooLarge {
            path: "budgets/a".into(),
            size: 2,
            limit: 1
        }
        .is_transient());
    }

    #[test]
    fn error_display_names_path_and_sizes() {
        let err = StoreError::DocumentTooLarge {
            path: "budgets/b1/chunks/transactions-00000".into(),
            size: 2_000_000,
            limit: 1_048_576,
        };
        let text = err.to_string();
        assert!(text.contains("transactions-00000"));
        assert!(text.contains("1048576"));
    }
}
