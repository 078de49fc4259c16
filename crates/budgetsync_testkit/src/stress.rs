//! Stress utilities for the sync engine.
//!
//! These helpers drive an engine from many threads and report how the
//! operations went.

use crate::fixtures::{test_author, transactions};
use budgetsync_engine::ChunkedSyncEngine;
use budgetsync_protocol::{BudgetData, TrackedField};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Transactions per saved dataset.
    pub records: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 5,
            threads: 4,
            records: 200,
        }
    }
}

/// Dataset saved by `thread` on its `round`-th operation. Record sizes do
/// not depend on either, so chunk layouts match across datasets.
pub fn stress_dataset(records: usize, thread: usize, round: usize) -> BudgetData {
    let mut rows = transactions(records);
    for row in &mut rows {
        row["memo"] = format!("thread {thread:02} round {round:04}").into();
    }
    BudgetData::new().with_field(TrackedField::Transactions, rows)
}

/// Saves from every thread at once.
pub fn stress_concurrent_saves(
    engine: Arc<ChunkedSyncEngine>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let config = config.clone();

            thread::spawn(move || {
                barrier.wait();
                for round in 0..config.operations {
                    let data = stress_dataset(config.records, t, round);
                    match engine.save_to_cloud(&data, &test_author()) {
                        Ok(outcome) if outcome.success => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Loads from every thread while one thread keeps saving.
///
/// A load counts as successful only if it returns a complete dataset of
/// `config.records` transactions.
pub fn stress_loads_during_saves(
    engine: Arc<ChunkedSyncEngine>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let writer = {
        let engine = Arc::clone(&engine);
        let config = config.clone();
        thread::spawn(move || {
            for round in 0..config.operations * 2 {
                let data = stress_dataset(config.records, 0, round);
                engine
                    .save_to_cloud(&data, &test_author())
                    .expect("Writer failed");
            }
        })
    };

    let readers: Vec<_> = (0..config.threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let config = config.clone();

            thread::spawn(move || {
                for _ in 0..config.operations {
                    let complete = engine.load_from_cloud().ok().and_then(|o| o.data).is_some_and(
                        |data| data.field(TrackedField::Transactions).len() == config.records,
                    );
                    if complete {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    writer.join().expect("Writer panicked");
    for handle in readers {
        handle.join().expect("Reader panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{small_config, TestEngine};
    use crate::probe::ProbeStore;
    use budgetsync_crypto::EncryptionKey;

    #[test]
    fn concurrent_saves_never_overlap() {
        let probe = Arc::new(ProbeStore::memory().with_commit_delay(Duration::from_millis(5)));
        let harness = TestEngine::over(probe.clone(), EncryptionKey::generate(), small_config());
        let engine = Arc::new(harness.sibling());
        let config = StressConfig::default();

        let result = stress_concurrent_saves(Arc::clone(&engine), &config);
        result.print_summary("concurrent saves");

        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, config.threads * config.operations);
        assert_eq!(probe.max_concurrent_commits(), 1);
        assert_eq!(probe.commits(), result.successful_ops as u64);
        assert!(engine.serializer().contended() > 0);
        assert!(engine.load_from_cloud().unwrap().has_data());
    }

    #[test]
    fn loads_see_whole_generations() {
        let harness = TestEngine::memory_with(small_config());
        let engine = Arc::new(harness.sibling());
        let config = StressConfig::default();
        engine
            .save_to_cloud(&stress_dataset(config.records, 9, 0), &test_author())
            .unwrap();

        let result = stress_loads_during_saves(engine, &config);
        result.print_summary("loads during saves");
        assert_eq!(result.failed_ops, 0);
    }
}
