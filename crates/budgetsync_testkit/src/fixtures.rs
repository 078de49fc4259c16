//! Test fixtures and engine helpers.
//!
//! Provides realistic budget records and engines wired to throwaway
//! stores.

use budgetsync_crypto::{AesGcmCipher, EncryptionKey};
use budgetsync_engine::{ChunkedSyncEngine, LoadOutcome, SaveOutcome, StaticAuthenticator, SyncConfig};
use budgetsync_protocol::{AuthorMeta, BudgetData, Record, TrackedField};
use budgetsync_store::{
    CollectionPath, Document, DocumentPath, DocumentStore, FileDocumentStore,
    InMemoryDocumentStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Budget id used by every fixture.
pub const TEST_BUDGET_ID: &str = "budget-test-0001";

/// Root collection used by every fixture.
pub const TEST_ROOT_COLLECTION: &str = "budgets";

const PAYEES: [&str; 6] = [
    "Corner Grocery Market",
    "City Transit Authority",
    "Riverside Pharmacy",
    "Northside Fuel Stop",
    "Maple Street Bakery",
    "Online Bookshop",
];

const MEMOS: [&str; 4] = [
    "weekly household shopping",
    "monthly commuter pass top-up",
    "prescription refill pickup",
    "birthday present for a friend",
];

/// A transaction record of roughly 150 bytes of JSON.
pub fn transaction(index: usize) -> Record {
    let cents = (index * 7_919) % 250_000;
    json!({
        "id": format!("txn-{index:07}"),
        "date": format!("2026-{:02}-{:02}", index % 12 + 1, index % 28 + 1),
        "amount": -(cents as f64) / 100.0,
        "payee": PAYEES[index % PAYEES.len()],
        "envelopeId": format!("env-{:03}", index % 24),
        "memo": MEMOS[index % MEMOS.len()],
        "cleared": index % 3 == 0,
    })
}

/// `count` transaction records in index order.
pub fn transactions(count: usize) -> Vec<Record> {
    (0..count).map(transaction).collect()
}

/// A record for `field` at position `index`.
pub fn record_for(field: TrackedField, index: usize) -> Record {
    match field {
        TrackedField::Transactions => transaction(index),
        TrackedField::Envelopes => json!({
            "id": format!("env-{index:03}"),
            "name": format!("Envelope {index}"),
            "budgeted": 50 + index * 25,
            "rollover": index % 2 == 0,
        }),
        TrackedField::Bills => json!({
            "id": format!("bill-{index:03}"),
            "name": format!("Bill {index}"),
            "amount": 20 + index * 5,
            "dueDay": index % 28 + 1,
            "frequency": "monthly",
        }),
        TrackedField::Debts => json!({
            "id": format!("debt-{index:03}"),
            "name": format!("Loan {index}"),
            "balance": 1_000 + index * 250,
            "apr": 4.5,
        }),
        TrackedField::SavingsGoals => json!({
            "id": format!("goal-{index:03}"),
            "name": format!("Goal {index}"),
            "target": 5_000,
            "saved": index * 100,
        }),
        TrackedField::PaycheckHistory => json!({
            "id": format!("pay-{index:04}"),
            "date": format!("2026-{:02}-15", index % 12 + 1),
            "amount": 2_450.75,
        }),
    }
}

/// A budget with `transaction_count` transactions and a few of everything else.
pub fn sample_budget(transaction_count: usize) -> BudgetData {
    let mut data = BudgetData::new().with_field(
        TrackedField::Transactions,
        transactions(transaction_count),
    );
    for (field, count) in [
        (TrackedField::Envelopes, 24),
        (TrackedField::Bills, 12),
        (TrackedField::Debts, 3),
        (TrackedField::SavingsGoals, 4),
        (TrackedField::PaycheckHistory, 26),
    ] {
        *data.field_mut(field) = (0..count).map(|i| record_for(field, i)).collect();
    }
    data
}

/// A single record whose JSON encoding is about `bytes` long.
pub fn padded_record(id: &str, bytes: usize) -> Record {
    let overhead = json!({"id": id, "note": ""}).to_string().len();
    json!({"id": id, "note": "x".repeat(bytes.saturating_sub(overhead))})
}

/// An author for fixtures.
pub fn test_author() -> AuthorMeta {
    AuthorMeta::new("Test Runner", "#0ea5e9")
}

/// Configuration with a small store ceiling so modest inputs span chunks.
///
/// 16 KiB ceiling, 4 KiB plaintext budget per chunk.
pub fn small_config() -> SyncConfig {
    SyncConfig::default().with_store_hard_limit(16_384)
}

/// Path of the fixture budget's root document.
pub fn root_path() -> DocumentPath {
    CollectionPath::root(TEST_ROOT_COLLECTION)
        .and_then(|c| c.doc(TEST_BUDGET_ID))
        .expect("Invalid root path")
}

/// Collection holding the fixture budget's chunks.
pub fn chunks_collection() -> CollectionPath {
    root_path()
        .collection("chunks")
        .expect("Invalid chunks collection")
}

/// Path of one chunk document of the fixture budget.
pub fn chunk_path(chunk_id: &str) -> DocumentPath {
    chunks_collection()
        .doc(chunk_id)
        .expect("Invalid chunk path")
}

/// An engine over a throwaway store.
pub struct TestEngine<S: DocumentStore + 'static = InMemoryDocumentStore> {
    /// The engine instance.
    pub engine: ChunkedSyncEngine,
    /// The backing store, shared with the engine.
    pub store: Arc<S>,
    /// The key the engine encrypts with.
    pub key: EncryptionKey,
    config: SyncConfig,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestEngine<InMemoryDocumentStore> {
    /// An engine over a fresh in-memory store with default limits.
    pub fn memory() -> Self {
        Self::memory_with(SyncConfig::default())
    }

    /// An engine over a fresh in-memory store with `config`.
    pub fn memory_with(config: SyncConfig) -> Self {
        Self::over(
            Arc::new(InMemoryDocumentStore::new()),
            EncryptionKey::generate(),
            config,
        )
    }
}

impl TestEngine<FileDocumentStore> {
    /// An engine over a file store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            FileDocumentStore::open(temp_dir.path()).expect("Failed to open file store");
        let mut harness = Self::over(Arc::new(store), EncryptionKey::generate(), small_config());
        harness._temp_dir = Some(temp_dir);
        harness
    }
}

impl<S: DocumentStore + 'static> TestEngine<S> {
    /// An engine over `store` with `key` and `config`.
    pub fn over(store: Arc<S>, key: EncryptionKey, config: SyncConfig) -> Self {
        let engine = build_engine(store.clone(), key.clone(), config.clone());
        Self {
            engine,
            store,
            key,
            config,
            _temp_dir: None,
        }
    }

    /// A second engine on the same store, key and configuration.
    pub fn sibling(&self) -> ChunkedSyncEngine {
        build_engine(self.store.clone(), self.key.clone(), self.config.clone())
    }

    /// An engine on the same store with a different key.
    pub fn stranger(&self) -> ChunkedSyncEngine {
        build_engine(
            self.store.clone(),
            EncryptionKey::generate(),
            self.config.clone(),
        )
    }

    /// Saves `data` and panics on failure.
    pub fn save(&self, data: &BudgetData) -> SaveOutcome {
        self.engine
            .save_to_cloud(data, &test_author())
            .expect("Failed to save")
    }

    /// Loads and panics on failure.
    pub fn load(&self) -> LoadOutcome {
        self.engine.load_from_cloud().expect("Failed to load")
    }

    /// The root document as stored.
    pub fn root_document(&self) -> Option<Document> {
        self.store.get(&root_path()).expect("Failed to read root")
    }

    /// Every chunk document stamped with the fixture budget id.
    pub fn chunk_documents(&self) -> Vec<(DocumentPath, Document)> {
        self.store
            .query_eq(
                &chunks_collection(),
                "budgetId",
                &Value::String(TEST_BUDGET_ID.to_owned()),
            )
            .expect("Failed to query chunks")
    }
}

impl<S: DocumentStore + 'static> std::ops::Deref for TestEngine<S> {
    type Target = ChunkedSyncEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

fn build_engine<S: DocumentStore + 'static>(
    store: Arc<S>,
    key: EncryptionKey,
    config: SyncConfig,
) -> ChunkedSyncEngine {
    ChunkedSyncEngine::initialize(
        TEST_BUDGET_ID,
        key,
        store,
        Arc::new(AesGcmCipher::new()),
        Arc::new(StaticAuthenticator::authenticated()),
        config,
    )
    .expect("Failed to initialize engine")
}

/// Runs a test with an engine over a fresh in-memory store.
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&TestEngine) -> R,
{
    let harness = TestEngine::memory();
    f(&harness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetsync_codec::estimate_size;

    #[test]
    fn transactions_are_about_150_bytes() {
        for i in [0, 1, 17, 999, 11_999] {
            let size = estimate_size(&transaction(i)).unwrap();
            assert!((140..=185).contains(&size), "record {i} is {size} bytes");
        }
    }

    #[test]
    fn padded_record_hits_target() {
        let size = estimate_size(&padded_record("big", 10_000)).unwrap();
        assert_eq!(size, 10_000);
    }

    #[test]
    fn sample_budget_fills_every_field() {
        let data = sample_budget(10);
        for field in TrackedField::ALL {
            assert!(!data.field(field).is_empty(), "{field} is empty");
        }
    }

    #[test]
    fn with_engine_round_trips() {
        with_engine(|harness| {
            let data = sample_budget(50);
            harness.save(&data);
            assert_eq!(harness.load().data, Some(data));
        });
    }

    #[test]
    fn file_engine_round_trips() {
        let harness = TestEngine::file();
        let data = sample_budget(80);
        harness.save(&data);
        assert_eq!(harness.sibling().load_from_cloud().unwrap().data, Some(data));
    }
}
