//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use budgetsync_store::DEFAULT_MAX_DOCUMENT_SIZE;
use std::time::Duration;

/// Configuration for chunked sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hard per-document ceiling of the remote store, in bytes.
    ///
    /// The engine uses the smaller of this and the store's own ceiling.
    pub store_hard_limit: usize,
    /// Divisor applied to the hard limit to leave room for encryption,
    /// encoding and envelope overhead.
    pub overhead_multiplier: f64,
    /// Items above this fraction of the effective budget are logged.
    pub oversize_warn_ratio: f64,
    /// Chunks above this fraction of the effective budget are split early.
    pub proactive_split_ratio: f64,
    /// How many times an oversized chunk may be halved before giving up.
    pub max_bisect_depth: u32,
    /// Smallest plausible ciphertext, in bytes.
    pub min_ciphertext_len: usize,
    /// Smallest plausible IV, in bytes.
    pub min_iv_len: usize,
    /// Top-level collection holding the sync roots.
    pub root_collection: String,
    /// Delete chunks the new generation no longer references.
    pub prune_orphans: bool,
    /// Corruption recovery behavior.
    pub recovery: RecoveryPolicy,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            store_hard_limit: DEFAULT_MAX_DOCUMENT_SIZE,
            overhead_multiplier: 4.0,
            oversize_warn_ratio: 0.8,
            proactive_split_ratio: 0.9,
            max_bisect_depth: 8,
            min_ciphertext_len: 16,
            min_iv_len: 12,
            root_collection: "budgets".into(),
            prune_orphans: true,
            recovery: RecoveryPolicy::default(),
        }
    }

    /// Sets the store hard limit.
    pub fn with_store_hard_limit(mut self, limit: usize) -> Self {
        self.store_hard_limit = limit;
        self
    }

    /// Sets the overhead multiplier.
    pub fn with_overhead_multiplier(mut self, multiplier: f64) -> Self {
        self.overhead_multiplier = multiplier;
        self
    }

    /// Sets the oversized-item warning ratio.
    pub fn with_oversize_warn_ratio(mut self, ratio: f64) -> Self {
        self.oversize_warn_ratio = ratio;
        self
    }

    /// Sets the proactive split ratio.
    pub fn with_proactive_split_ratio(mut self, ratio: f64) -> Self {
        self.proactive_split_ratio = ratio;
        self
    }

    /// Sets the maximum bisection depth.
    pub fn with_max_bisect_depth(mut self, depth: u32) -> Self {
        self.max_bisect_depth = depth;
        self
    }

    /// Sets the root collection name.
    pub fn with_root_collection(mut self, name: impl Into<String>) -> Self {
        self.root_collection = name.into();
        self
    }

    /// Enables or disables orphan pruning on save.
    pub fn with_prune_orphans(mut self, prune: bool) -> Self {
        self.prune_orphans = prune;
        self
    }

    /// Sets the recovery policy.
    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Byte budget for the plaintext items of one chunk.
    pub fn effective_budget(&self) -> usize {
        (self.store_hard_limit as f64 / self.overhead_multiplier) as usize
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending setting.
    pub fn validate(&self) -> SyncResult<()> {
        if self.store_hard_limit == 0 {
            return Err(SyncError::InvalidConfig("store_hard_limit must be positive".into()));
        }
        if self.overhead_multiplier.is_nan() || self.overhead_multiplier < 1.0 {
            return Err(SyncError::InvalidConfig(format!(
                "overhead_multiplier must be at least 1.0, got {}",
                self.overhead_multiplier
            )));
        }
        for (name, ratio) in [
            ("oversize_warn_ratio", self.oversize_warn_ratio),
            ("proactive_split_ratio", self.proactive_split_ratio),
        ] {
            if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
                return Err(SyncError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {ratio}"
                )));
            }
        }
        if self.root_collection.is_empty() || self.root_collection.contains('/') {
            return Err(SyncError::InvalidConfig(format!(
                "invalid root collection {:?}",
                self.root_collection
            )));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How the engine reacts to a corrupted manifest.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    /// Reset the remote root automatically on a confirmed corruption.
    ///
    /// When false the corruption is only reported and the caller decides
    /// whether to call `reset_cloud_data`.
    pub auto_reset: bool,
    /// Minimum time between two automatic resets.
    pub reset_cooldown: Duration,
    /// Repeats of the same failure inside this window are logged quietly.
    pub failure_backoff: Duration,
    /// Window used to detect a repeated truncation pattern.
    pub pattern_window: Duration,
    /// Truncation-class failures inside the window that form a pattern.
    pub pattern_threshold: usize,
}

impl RecoveryPolicy {
    /// Creates a policy with default values.
    pub fn new() -> Self {
        Self {
            auto_reset: true,
            reset_cooldown: Duration::from_secs(5 * 60),
            failure_backoff: Duration::from_secs(5 * 60),
            pattern_window: Duration::from_secs(10 * 60),
            pattern_threshold: 2,
        }
    }

    /// A policy that never resets on its own.
    pub fn manual() -> Self {
        Self::new().with_auto_reset(false)
    }

    /// Enables or disables automatic reset.
    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    /// Sets the reset cooldown.
    pub fn with_reset_cooldown(mut self, cooldown: Duration) -> Self {
        self.reset_cooldown = cooldown;
        self
    }

    /// Sets the failure backoff window.
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.store_hard_limit, 1_048_576);
        assert_eq!(config.effective_budget(), 262_144);
        assert_eq!(config.max_bisect_depth, 8);
        assert_eq!(config.root_collection, "budgets");
        assert!(config.recovery.auto_reset);
        assert_eq!(config.recovery.reset_cooldown, Duration::from_secs(300));
        config.validate().unwrap();
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_store_hard_limit(64 * 1024)
            .with_overhead_multiplier(2.0)
            .with_max_bisect_depth(3)
            .with_prune_orphans(false)
            .with_recovery(RecoveryPolicy::manual());

        assert_eq!(config.effective_budget(), 32 * 1024);
        assert_eq!(config.max_bisect_depth, 3);
        assert!(!config.prune_orphans);
        assert!(!config.recovery.auto_reset);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(SyncConfig::new().with_overhead_multiplier(0.5).validate().is_err());
        assert!(SyncConfig::new().with_overhead_multiplier(f64::NAN).validate().is_err());
        assert!(SyncConfig::new().with_oversize_warn_ratio(0.0).validate().is_err());
        assert!(SyncConfig::new().with_proactive_split_ratio(1.5).validate().is_err());
        assert!(SyncConfig::new().with_root_collection("").validate().is_err());
        assert!(SyncConfig::new().with_store_hard_limit(0).validate().is_err());
        assert!(SyncConfig::new().with_proactive_split_ratio(1.0).validate().is_ok());
    }
}
