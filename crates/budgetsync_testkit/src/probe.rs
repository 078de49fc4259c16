//! Store wrappers that observe or disturb the traffic of an engine.

use budgetsync_store::{
    CollectionPath, Document, DocumentPath, DocumentStore, InMemoryDocumentStore, StoreError,
    StoreResult, WriteBatch,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Wraps a store, recording overlapping commits and failing reads of
/// chosen paths.
pub struct ProbeStore<S: DocumentStore = InMemoryDocumentStore> {
    inner: S,
    commit_delay: Duration,
    active_commits: AtomicUsize,
    max_active_commits: AtomicUsize,
    commits: AtomicU64,
    reads: AtomicU64,
    failing_reads: Mutex<BTreeSet<DocumentPath>>,
}

impl ProbeStore<InMemoryDocumentStore> {
    /// A probe over a fresh in-memory store.
    pub fn memory() -> Self {
        Self::new(InMemoryDocumentStore::new())
    }
}

impl<S: DocumentStore> ProbeStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            commit_delay: Duration::ZERO,
            active_commits: AtomicUsize::new(0),
            max_active_commits: AtomicUsize::new(0),
            commits: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            failing_reads: Mutex::new(BTreeSet::new()),
        }
    }

    /// Holds every commit open for `delay`, widening race windows.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Highest number of commits observed running at once.
    pub fn max_concurrent_commits(&self) -> usize {
        self.max_active_commits.load(Ordering::SeqCst)
    }

    /// Commits attempted so far.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Single-document reads so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes reads of `path` fail with a transient error.
    pub fn fail_reads_of(&self, path: DocumentPath) {
        self.failing_reads.lock().insert(path);
    }

    /// Stops failing reads.
    pub fn clear_read_failures(&self) {
        self.failing_reads.lock().clear();
    }
}

impl<S: DocumentStore> DocumentStore for ProbeStore<S> {
    fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().contains(path) {
            return Err(StoreError::Unavailable(format!("injected read failure: {path}")));
        }
        self.inner.get(path)
    }

    fn put(&self, path: &DocumentPath, document: Document) -> StoreResult<()> {
        self.inner.put(path, document)
    }

    fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        self.inner.delete(path)
    }

    fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(DocumentPath, Document)>> {
        self.inner.query_eq(collection, field, value)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let active = self.active_commits.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_commits.fetch_max(active, Ordering::SeqCst);
        if !self.commit_delay.is_zero() {
            thread::sleep(self.commit_delay);
        }
        let result = self.inner.commit(batch);
        self.active_commits.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn max_document_size(&self) -> usize {
        self.inner.max_document_size()
    }

    fn max_batch_ops(&self) -> usize {
        self.inner.max_batch_ops()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{chunk_path, sample_budget, small_config, TestEngine};
    use budgetsync_crypto::EncryptionKey;
    use budgetsync_engine::SyncError;
    use std::sync::Arc;

    #[test]
    fn read_failures_on_chunks_propagate() {
        let probe = Arc::new(ProbeStore::memory());
        let harness = TestEngine::over(probe.clone(), EncryptionKey::generate(), small_config());
        let data = sample_budget(20);
        harness.save(&data);

        probe.fail_reads_of(chunk_path("bills-00000"));
        let err = harness.load_from_cloud().unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert!(err.is_retryable());

        probe.clear_read_failures();
        assert_eq!(harness.load().data, Some(data));
        assert!(probe.reads() > 0);
    }

    #[test]
    fn probe_counts_commits() {
        let probe = Arc::new(ProbeStore::memory());
        let harness = TestEngine::over(probe.clone(), EncryptionKey::generate(), small_config());
        harness.save(&sample_budget(5));
        assert_eq!(probe.commits(), 1);
        assert_eq!(probe.max_concurrent_commits(), 1);
    }
}
