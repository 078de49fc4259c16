//! Reset command implementation.

use super::{open_engine, open_store, KeySource, Target};
use budgetsync_engine::ResetOutcome;

/// Runs the reset command.
pub fn run(target: &Target, key: &KeySource) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = reset(target, key)?;
    println!(
        "Reset budget {}: {} chunks deleted, tombstone at {}",
        target.budget_id, outcome.chunks_deleted, outcome.deleted_at
    );
    Ok(())
}

/// Tombstones the budget and deletes its chunks.
pub fn reset(target: &Target, key: &KeySource) -> Result<ResetOutcome, Box<dyn std::error::Error>> {
    let engine = open_engine(target, open_store(target)?, key)?;
    Ok(engine.reset_cloud_data()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::inspect::inspect;
    use crate::commands::test_support::{key, seed, target};

    #[test]
    fn reset_leaves_tombstone() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());
        seed(&target);

        let outcome = reset(&target, &key()).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.chunks_deleted, 2);

        let result = inspect(&target, Some(&key())).unwrap();
        assert_eq!(result.root, "tombstone");
        assert_eq!(result.stored_chunks, 0);
    }
}
