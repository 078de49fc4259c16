//! Document store trait definition.

use crate::batch::WriteBatch;
use crate::error::StoreResult;
use crate::path::{CollectionPath, DocumentPath};
use serde_json::Value;
use std::sync::Arc;

/// A stored document: a JSON object.
pub type Document = Value;

/// Per-document size ceiling of common hosted document databases (1 MiB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 1_048_576;

/// Maximum number of writes accepted in one batch commit by default.
pub const DEFAULT_MAX_BATCH_OPS: usize = 500;

/// A hierarchical document store with a hard per-document size ceiling.
///
/// Stores are **opaque**: they do not interpret document contents beyond
/// the top-level field equality used by [`query_eq`](Self::query_eq).
///
/// # Invariants
///
/// - `commit` applies every operation of a batch or none of them
/// - No document larger than `max_document_size()` is ever persisted
/// - Implementations must be `Send + Sync` for concurrent access
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Creates or replaces a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is too large or the write fails.
    fn put(&self, path: &DocumentPath, document: Document) -> StoreResult<()>;

    /// Deletes a single document. Deleting a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, path: &DocumentPath) -> StoreResult<()>;

    /// Returns every direct child of `collection` whose top-level `field`
    /// equals `value`, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(DocumentPath, Document)>>;

    /// Commits a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation is invalid or the commit fails;
    /// in either case no operation from the batch is applied.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// The hard per-document size ceiling in bytes.
    fn max_document_size(&self) -> usize;

    /// Maximum number of operations accepted in one [`commit`](Self::commit).
    fn max_batch_ops(&self) -> usize {
        DEFAULT_MAX_BATCH_OPS
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        (**self).get(path)
    }

    fn put(&self, path: &DocumentPath, document: Document) -> StoreResult<()> {
        (**self).put(path, document)
    }

    fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        (**self).delete(path)
    }

    fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(DocumentPath, Document)>> {
        (**self).query_eq(collection, field, value)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        (**self).commit(batch)
    }

    fn max_document_size(&self) -> usize {
        (**self).max_document_size()
    }

    fn max_batch_ops(&self) -> usize {
        (**self).max_batch_ops()
    }
}
