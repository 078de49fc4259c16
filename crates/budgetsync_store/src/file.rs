//! Directory-backed document store.
//!
//! Layout:
//!
//! ```text
//! store_dir/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ documents.json    # Path -> document map
//! └─ documents.tmp     # Temporary file for atomic replacement
//! ```
//!
//! Every mutation rewrites `documents.json` through write-then-rename, so a
//! batch either lands completely or not at all, even across a crash.

use crate::batch::WriteBatch;
use crate::error::{StoreError, StoreResult};
use crate::map::{validate_batch, validate_document, DocumentMap};
use crate::path::{CollectionPath, DocumentPath};
use crate::store::{Document, DocumentStore, DEFAULT_MAX_BATCH_OPS, DEFAULT_MAX_DOCUMENT_SIZE};
use fs2::FileExt;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const DOCUMENTS_FILE: &str = "documents.json";
const DOCUMENTS_TEMP: &str = "documents.tmp";

/// A document store persisted to a local directory.
///
/// The store holds an exclusive advisory lock on its directory for as
/// long as it is open. The whole document set is mirrored in memory and
/// flushed on every commit.
#[derive(Debug)]
pub struct FileDocumentStore {
    dir: PathBuf,
    documents: RwLock<DocumentMap>,
    max_document_size: usize,
    max_batch_ops: usize,
    _lock_file: File,
}

impl FileDocumentStore {
    /// Opens (or creates) a store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another process holds the lock (returns `Locked`)
    /// - `documents.json` cannot be parsed (returns `Corrupted`)
    /// - I/O errors occur
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_limits(dir, DEFAULT_MAX_DOCUMENT_SIZE, DEFAULT_MAX_BATCH_OPS)
    }

    /// Opens a store with custom limits.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_limits(
        dir: impl AsRef<Path>,
        max_document_size: usize,
        max_batch_ops: usize,
    ) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        if !dir.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "not a directory: {}",
                dir.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        let documents = load_documents(&dir.join(DOCUMENTS_FILE))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            documents: RwLock::new(documents),
            max_document_size,
            max_batch_ops,
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
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

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut guard = self.documents.write();
        let mut next = guard.clone();
        next.apply(batch.into_ops());
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Writes the document map to disk atomically.
    fn persist(&self, documents: &DocumentMap) -> StoreResult<()> {
        let mut map = Map::new();
        for (path, doc) in documents.documents() {
            map.insert(path.to_string(), doc.clone());
        }
        let data = serde_json::to_vec_pretty(&Value::Object(map))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let temp_path = self.dir.join(DOCUMENTS_TEMP);
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.dir.join(DOCUMENTS_FILE))?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn load_documents(path: &Path) -> StoreResult<DocumentMap> {
    if !path.exists() {
        return Ok(DocumentMap::default());
    }
    let data = fs::read(path)?;
    if data.is_empty() {
        return Ok(DocumentMap::default());
    }

    let value: Value = serde_json::from_slice(&data)
        .map_err(|e| StoreError::Corrupted(format!("{}: {e}", path.display())))?;
    let Value::Object(entries) = value else {
        return Err(StoreError::Corrupted(format!(
            "{}: top level is not an object",
            path.display()
        )));
    };

    let mut documents = BTreeMap::new();
    for (key, doc) in entries {
        let doc_path = DocumentPath::parse(&key)
            .map_err(|e| StoreError::Corrupted(format!("bad stored path {key:?}: {e}")))?;
        documents.insert(doc_path, doc);
    }
    Ok(DocumentMap::from_documents(documents))
}

impl DocumentStore for FileDocumentStore {
    fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        Ok(self.documents.read().get(path).cloned())
    }

    fn put(&self, path: &DocumentPath, document: Document) -> StoreResult<()> {
        validate_document(path, &document, self.max_document_size)?;
        let mut batch = WriteBatch::new();
        batch.set(path.clone(), document);
        self.apply(batch)
    }

    fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(path.clone());
        self.apply(batch)
    }

    fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(DocumentPath, Document)>> {
        Ok(self.documents.read().query_eq(collection, field, value))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        validate_batch(&batch, self.max_document_size, self.max_batch_ops)?;
        self.apply(batch)
    }

    fn max_document_size(&self) -> usize {
        self.max_document_size
    }

    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn path(p: &str) -> DocumentPath {
        DocumentPath::parse(p).unwrap()
    }

    #[test]
    fn open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let store = FileDocumentStore::open(&dir).unwrap();
        assert!(store.is_empty());
        assert!(dir.join(LOCK_FILE).exists());
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = TempDir::new().unwrap();
        let _first = FileDocumentStore::open(temp.path()).unwrap();
        assert!(matches!(
            FileDocumentStore::open(temp.path()),
            Err(StoreError::Locked)
        ));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        drop(FileDocumentStore::open(temp.path()).unwrap());
        assert!(FileDocumentStore::open(temp.path()).is_ok());
    }

    #[test]
    fn commit_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = FileDocumentStore::open(temp.path()).unwrap();
            let mut batch = WriteBatch::new();
            batch
                .set(path("budgets/b1"), json!({"type": "budget_manifest"}))
                .set(path("budgets/b1/chunks/bills-00000"), json!({"budgetId": "b1"}));
            store.commit(batch).unwrap();
        }

        let store = FileDocumentStore::open(temp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get(&path("budgets/b1")).unwrap(),
            Some(json!({"type": "budget_manifest"}))
        );
        assert!(!temp.path().join(DOCUMENTS_TEMP).exists());
    }

    #[test]
    fn rejected_batch_leaves_disk_untouched() {
        let temp = TempDir::new().unwrap();
        let store = FileDocumentStore::open_with_limits(temp.path(), 64, 10).unwrap();
        store.put(&path("budgets/b1"), json!({"v": 1})).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .delete(path("budgets/b1"))
            .set(path("budgets/b2"), json!({"blob": "x".repeat(200)}));
        assert!(store.commit(batch).is_err());
        drop(store);

        let reopened = FileDocumentStore::open(temp.path()).unwrap();
        assert_eq!(reopened.paths(), vec![path("budgets/b1")]);
    }

    #[test]
    fn corrupted_file_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(DOCUMENTS_FILE), b"{not json").unwrap();
        assert!(matches!(
            FileDocumentStore::open(temp.path()),
            Err(StoreError::Corrupted(_))
        ));
    }

    #[test]
    fn query_reads_from_mirror() {
        let temp = TempDir::new().unwrap();
        let store = FileDocumentStore::open(temp.path()).unwrap();
        store
            .put(&path("budgets/b1/chunks/a"), json!({"budgetId": "b1"}))
            .unwrap();
        let chunks = path("budgets/b1").collection("chunks").unwrap();
        assert_eq!(store.query_eq(&chunks, "budgetId", &json!("b1")).unwrap().len(), 1);
    }
}
