//! Garbage collection command implementation.

use super::inspect::count_chunks;
use super::{open_engine, open_store, KeySource, Target};
use budgetsync_engine::GcOutcome;

/// Runs the gc command.
pub fn run(target: &Target, key: &KeySource) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = gc(target, key)?;
    println!(
        "Removed {} unreferenced chunk documents from budget {}",
        outcome.removed, target.budget_id
    );
    Ok(())
}

/// Deletes chunk documents the manifest does not reference.
pub fn gc(target: &Target, key: &KeySource) -> Result<GcOutcome, Box<dyn std::error::Error>> {
    let store = open_store(target)?;
    let before = count_chunks(&store, target)?;
    let engine = open_engine(target, store, key)?;
    let outcome = engine.collect_garbage()?;
    tracing::debug!(before, removed = outcome.removed, "garbage collected");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{key, seed, target};
    use budgetsync_store::{CollectionPath, DocumentStore};
    use serde_json::json;

    #[test]
    fn gc_removes_stray_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());
        seed(&target);
        {
            let store = open_store(&target).unwrap();
            let path = CollectionPath::root("budgets")
                .and_then(|c| c.doc("cli-budget"))
                .and_then(|d| d.collection("chunks"))
                .and_then(|c| c.doc("transactions-00007"))
                .unwrap();
            store
                .put(&path, json!({"budgetId": "cli-budget", "chunkIndex": 7}))
                .unwrap();
        }

        assert_eq!(gc(&target, &key()).unwrap().removed, 1);
        assert_eq!(gc(&target, &key()).unwrap().removed, 0);
    }
}
