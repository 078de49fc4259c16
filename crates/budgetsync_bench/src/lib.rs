//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use budgetsync_crypto::{AesGcmCipher, EncryptionKey};
use budgetsync_engine::{ChunkedSyncEngine, StaticAuthenticator, SyncConfig};
use budgetsync_protocol::{BudgetData, Record, TrackedField};
use budgetsync_store::InMemoryDocumentStore;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` transaction records with random amounts.
pub fn generate_transactions(count: usize) -> Vec<Record> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            json!({
                "id": format!("txn-{i:07}"),
                "date": format!("2026-{:02}-{:02}", rng.gen_range(1..=12), rng.gen_range(1..=28)),
                "amount": -(rng.gen_range(1..250_000) as f64) / 100.0,
                "payee": "Corner Grocery Market",
                "envelopeId": format!("env-{:03}", rng.gen_range(0..24)),
                "memo": "weekly household shopping",
                "cleared": rng.gen_bool(0.3),
            })
        })
        .collect()
}

/// A budget holding `count` transactions.
pub fn generate_budget(count: usize) -> BudgetData {
    BudgetData::new().with_field(TrackedField::Transactions, generate_transactions(count))
}

/// An engine over a fresh in-memory store.
pub fn memory_engine() -> ChunkedSyncEngine {
    ChunkedSyncEngine::initialize(
        "bench-budget",
        EncryptionKey::generate(),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(AesGcmCipher::new()),
        Arc::new(StaticAuthenticator::authenticated()),
        SyncConfig::default(),
    )
    .expect("Failed to initialize engine")
}
