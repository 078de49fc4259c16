//! In-memory document store for testing.

use crate::batch::WriteBatch;
use crate::error::{StoreError, StoreResult};
use crate::map::{validate_batch, validate_document, DocumentMap};
use crate::path::{CollectionPath, DocumentPath};
use crate::store::{Document, DocumentStore, DEFAULT_MAX_BATCH_OPS, DEFAULT_MAX_DOCUMENT_SIZE};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// An in-memory document store.
///
/// This store keeps all documents in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// It also supports failure injection ([`fail_next_commits`](Self::fail_next_commits),
/// [`set_available`](Self::set_available)) so callers can exercise their
/// error paths.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use budgetsync_store::{DocumentPath, DocumentStore, InMemoryDocumentStore, WriteBatch};
/// use serde_json::json;
///
/// let store = InMemoryDocumentStore::new();
/// let path = DocumentPath::parse("budgets/demo").unwrap();
///
/// let mut batch = WriteBatch::new();
/// batch.set(path.clone(), json!({"type": "budget_manifest"}));
/// store.commit(batch).unwrap();
///
/// assert!(store.get(&path).unwrap().is_some());
/// ```
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    documents: RwLock<DocumentMap>,
    max_document_size: usize,
    max_batch_ops: usize,
    available: AtomicBool,
    failing_commits: AtomicUsize,
    commits: AtomicU64,
}

impl InMemoryDocumentStore {
    /// Creates an empty store with the default 1 MiB document ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_DOCUMENT_SIZE, DEFAULT_MAX_BATCH_OPS)
    }

    /// Creates an empty store with custom limits.
    #[must_use]
    pub fn with_limits(max_document_size: usize, max_batch_ops: usize) -> Self {
        Self {
            documents: RwLock::new(DocumentMap::default()),
            max_document_size,
            max_batch_ops,
            available: AtomicBool::new(true),
            failing_commits: AtomicUsize::new(0),
            commits: AtomicU64::new(0),
        }
    }

    /// Makes the next `count` commits fail without applying anything.
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Toggles availability. An unavailable store fails every operation.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful batch commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every stored path, in order.
    #[must_use]
    pub fn paths(&self) -> Vec<DocumentPath> {
        self.documents.read().documents().keys().cloned().collect()
    }

    /// Overwrites a document without any validation.
    ///
    /// Useful for planting damaged documents in tests.
    pub fn insert_raw(&self, path: DocumentPath, document: Document) {
        let mut batch = WriteBatch::new();
        batch.set(path, document);
        self.documents.write().apply(batch.into_ops());
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store marked unavailable".into()))
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.check_available()?;
        Ok(self.documents.read().get(path).cloned())
    }

    fn put(&self, path: &DocumentPath, document: Document) -> StoreResult<()> {
        self.check_available()?;
        validate_document(path, &document, self.max_document_size)?;
        let mut batch = WriteBatch::new();
        batch.set(path.clone(), document);
        self.documents.write().apply(batch.into_ops());
        Ok(())
    }

    fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        self.check_available()?;
        let mut batch = WriteBatch::new();
        batch.delete(path.clone());
        self.documents.write().apply(batch.into_ops());
        Ok(())
    }

    fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(DocumentPath, Document)>> {
        self.check_available()?;
        Ok(self.documents.read().query_eq(collection, field, value))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.check_available()?;
        validate_batch(&batch, self.max_document_size, self.max_batch_ops)?;

        let injected = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::CommitFailed("injected commit failure".into()));
        }

        self.documents.write().apply(batch.into_ops());
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn max_document_size(&self) -> usize {
        self.max_document_size
    }

    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }
}
