//! Verify command implementation.

use super::{open_engine, open_store, KeySource, Target};
use budgetsync_engine::SyncError;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Chunks that decoded cleanly.
    pub chunks_ok: usize,
    /// Records reconstructed.
    pub records: usize,
    /// List of errors found.
    pub errors: Vec<String>,
    /// List of warnings found.
    pub warnings: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(target: &Target, key: &KeySource) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Verifying budget {} in {:?}",
        target.budget_id, target.path
    );
    println!();

    let result = verify(target, key)?;
    println!("Chunks OK: {}", result.chunks_ok);
    println!("Records: {}", result.records);
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
    for error in &result.errors {
        println!("  error: {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Budget verification passed");
        Ok(())
    } else {
        println!("✗ Budget verification failed");
        Err("Verification failed".into())
    }
}

/// Loads the budget without resetting anything and collects findings.
pub fn verify(target: &Target, key: &KeySource) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let engine = open_engine(target, open_store(target)?, key)?;
    let mut result = VerifyResult::default();

    let loaded = match engine.load_from_cloud() {
        Ok(loaded) => loaded,
        Err(e @ (SyncError::KeyMismatch | SyncError::ManifestUnreadable { .. })) => {
            result.errors.push(e.to_string());
            return Ok(result);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(fault) = &loaded.corruption {
        result.errors.push(format!("manifest: {fault}"));
    }
    for skipped in &loaded.report.skipped {
        result
            .errors
            .push(format!("chunk {}: {}", skipped.chunk_id, skipped.fault));
    }
    for field in &loaded.report.short_fields {
        result
            .errors
            .push(format!("{field}: fewer records than the manifest counted"));
    }
    for stale in &loaded.report.stale {
        result
            .warnings
            .push(format!("chunk {stale}: written by another generation"));
    }
    result.chunks_ok = loaded.report.chunks_loaded;
    result.records = loaded.data.map_or(0, |data| data.total_records());

    Ok(result)
}
