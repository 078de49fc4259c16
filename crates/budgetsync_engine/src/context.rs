//! Shared state of one engine instance.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::payload::PayloadCipher;
use budgetsync_crypto::{Cipher, EncryptionKey};
use budgetsync_protocol::{ChunkId, CHUNKS_COLLECTION};
use budgetsync_store::{CollectionPath, Document, DocumentPath, DocumentStore};
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything the write, read and recovery paths need about one root.
pub(crate) struct EngineContext {
    pub(crate) budget_id: String,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) payload: PayloadCipher,
    pub(crate) config: SyncConfig,
    /// Smaller of the configured and the store's own document ceiling.
    pub(crate) hard_limit: usize,
    pub(crate) root_path: DocumentPath,
    pub(crate) chunks: CollectionPath,
}

impl EngineContext {
    pub(crate) fn new(
        budget_id: String,
        key: EncryptionKey,
        store: Arc<dyn DocumentStore>,
        cipher: Arc<dyn Cipher>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        if budget_id.is_empty() {
            return Err(SyncError::NotInitialized("budget id is empty".into()));
        }
        config.validate()?;

        let root_path = CollectionPath::root(&config.root_collection)?.doc(&budget_id)?;
        let chunks = root_path.collection(CHUNKS_COLLECTION)?;
        let hard_limit = config.store_hard_limit.min(store.max_document_size());
        let payload = PayloadCipher::new(
            cipher,
            key,
            config.min_ciphertext_len,
            config.min_iv_len,
        );

        Ok(Self {
            budget_id,
            store,
            payload,
            config,
            hard_limit,
            root_path,
            chunks,
        })
    }

    /// Budget id shortened for log output.
    pub(crate) fn log_id(&self) -> &str {
        self.budget_id.get(..8).unwrap_or(&self.budget_id)
    }

    /// Plaintext byte budget of one chunk.
    pub(crate) fn effective_budget(&self) -> usize {
        (self.hard_limit as f64 / self.config.overhead_multiplier) as usize
    }

    pub(crate) fn chunk_path(&self, id: &ChunkId) -> SyncResult<DocumentPath> {
        Ok(self.chunks.doc(id.as_str())?)
    }

    /// Every chunk document stamped with this root's budget id.
    pub(crate) fn query_chunks(&self) -> SyncResult<Vec<(DocumentPath, Document)>> {
        Ok(self.store.query_eq(
            &self.chunks,
            "budgetId",
            &Value::String(self.budget_id.clone()),
        )?)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
