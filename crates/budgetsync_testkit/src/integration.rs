//! Cross-crate integration test helpers.
//!
//! Provides a harness that mirrors local edits and verifies that every
//! sync reproduces them remotely.

use crate::fixtures::{record_for, test_author, TestEngine};
use budgetsync_codec::estimate_size;
use budgetsync_engine::{LoadOutcome, SaveOutcome, SyncConfig};
use budgetsync_protocol::{BudgetData, Record, TrackedField};
use budgetsync_store::DocumentStore;

/// A harness that tracks the expected local state for verification.
pub struct SyncHarness {
    /// The engine under test.
    pub harness: TestEngine,
    expected: BudgetData,
    next_id: usize,
    syncs: usize,
}

impl SyncHarness {
    /// Creates a harness over an in-memory store with `config`.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            harness: TestEngine::memory_with(config),
            expected: BudgetData::new(),
            next_id: 0,
            syncs: 0,
        }
    }

    /// Appends a fixture record to `field`.
    pub fn add(&mut self, field: TrackedField) {
        let record = record_for(field, self.next_id);
        self.next_id += 1;
        self.expected.field_mut(field).push(record);
    }

    /// Appends `count` fixture records to `field`.
    pub fn add_many(&mut self, field: TrackedField, count: usize) {
        for _ in 0..count {
            self.add(field);
        }
    }

    /// Appends an arbitrary record to `field`.
    pub fn push(&mut self, field: TrackedField, record: Record) {
        self.expected.field_mut(field).push(record);
    }

    /// Appends `records` to `field`.
    pub fn push_all(&mut self, field: TrackedField, records: Vec<Record>) {
        self.expected.field_mut(field).extend(records);
    }

    /// Removes the first `count` records of `field`.
    pub fn remove_front(&mut self, field: TrackedField, count: usize) {
        let records = self.expected.field_mut(field);
        let count = count.min(records.len());
        records.drain(..count);
    }

    /// Saves the expected state.
    pub fn sync(&mut self) -> SaveOutcome {
        self.syncs += 1;
        self.harness
            .engine
            .save_to_cloud(&self.expected, &test_author())
            .expect("Failed to sync")
    }

    /// Loads and asserts the remote state equals the expected state.
    pub fn verify(&self) -> LoadOutcome {
        let loaded = self.harness.load();
        assert_eq!(
            loaded.data.as_ref(),
            Some(&self.expected),
            "remote state diverged after {} syncs",
            self.syncs
        );
        assert!(loaded.report.is_clean(), "{:?}", loaded.report);
        loaded
    }

    /// The state the remote side should hold after the next sync.
    pub fn expected(&self) -> &BudgetData {
        &self.expected
    }

    /// Asserts that no stored document exceeds `limit` bytes.
    pub fn assert_documents_fit(&self, limit: usize) {
        let mut documents = self.harness.chunk_documents();
        if let Some(root) = self.harness.root_document() {
            documents.push((crate::fixtures::root_path(), root));
        }
        for (path, doc) in documents {
            let size = estimate_size(&doc).expect("Failed to size document");
            assert!(size <= limit, "{path} is {size} bytes, limit {limit}");
        }
    }

    /// Number of chunk documents currently stored for the budget.
    pub fn stored_chunks(&self) -> usize {
        self.harness.chunk_documents().len()
    }

    /// Hard per-document ceiling of the backing store.
    pub fn store_limit(&self) -> usize {
        self.harness.store.max_document_size()
    }
}

impl Default for SyncHarness {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{padded_record, small_config, transactions};
    use budgetsync_engine::Chunker;

    #[test]
    fn twelve_thousand_transactions() {
        let mut sync = SyncHarness::default();
        sync.push_all(TrackedField::Transactions, transactions(12_000));

        let saved = sync.sync();
        let chunks = saved.chunk_counts[&TrackedField::Transactions];
        assert!((8..=10).contains(&chunks), "{chunks} chunks");

        let loaded = sync.verify();
        let got = loaded.data.unwrap();
        assert_eq!(got.field(TrackedField::Transactions).len(), 12_000);
        assert_eq!(got.field(TrackedField::Transactions)[0]["id"], "txn-0000000");
        assert_eq!(got.field(TrackedField::Transactions)[11_999]["id"], "txn-0011999");
        sync.assert_documents_fit(sync.store_limit());
    }

    #[test]
    fn round_trip_across_sizes() {
        for count in [0, 1, 2, 499, 3_000, 50_000] {
            let mut sync = SyncHarness::default();
            sync.push_all(TrackedField::Transactions, transactions(count));
            sync.sync();
            sync.verify();
        }
    }

    #[test]
    fn items_near_seventy_percent_stay_within_limit() {
        let config = SyncConfig::default();
        let budget = config.effective_budget();
        let big = budget * 7 / 10;

        let mut sync = SyncHarness::new(config);
        sync.add_many(TrackedField::Debts, 3);
        for i in 0..3 {
            sync.push(TrackedField::Debts, padded_record(&format!("big-{i}"), big));
            sync.add(TrackedField::Debts);
        }
        let saved = sync.sync();
        assert!(saved.chunk_counts[&TrackedField::Debts] >= 3);
        sync.assert_documents_fit(sync.store_limit());
        sync.verify();

        let ranges = Chunker::new(budget, 200)
            .plan(sync.expected().field(TrackedField::Debts), TrackedField::Debts)
            .unwrap();
        let records = sync.expected().field(TrackedField::Debts);
        for range in ranges {
            let bigs = records[range]
                .iter()
                .filter(|r| r["id"].as_str().is_some_and(|id| id.starts_with("big-")))
                .count();
            assert!(bigs <= 1);
        }
    }

    #[test]
    fn edits_over_many_generations() {
        let mut sync = SyncHarness::new(small_config());
        for round in 0..6 {
            sync.add_many(TrackedField::Transactions, 40);
            sync.add(TrackedField::Bills);
            if round % 2 == 1 {
                sync.remove_front(TrackedField::Transactions, 70);
            }
            let saved = sync.sync();
            assert_eq!(sync.stored_chunks(), saved.total_chunks());
            sync.verify();
        }
    }
}
