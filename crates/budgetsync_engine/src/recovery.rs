//! Corruption tracking, destructive reset and garbage collection.

use crate::config::RecoveryPolicy;
use crate::context::{now_millis, EngineContext};
use crate::error::{SyncError, SyncResult};
use crate::loader::{resolve_root, RootState};
use crate::manifest::ManifestFault;
use crate::outcome::ResetOutcome;
use budgetsync_protocol::{ChunkId, Tombstone};
use budgetsync_store::WriteBatch;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;
use tracing::{info, warn};

/// How a manifest failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureNote {
    /// The same kind of failure was already seen inside the backoff window.
    pub repeated: bool,
    /// Failures of this kind suppressed so far in the current window.
    pub suppressed: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    last_reset: Option<Instant>,
    last_failure: Option<(ManifestFault, Instant)>,
    suppressed: u64,
    truncations: VecDeque<Instant>,
}

/// Remembers recent manifest failures and resets.
///
/// All methods take the current instant so tests can drive time.
#[derive(Debug)]
pub struct RecoveryTracker {
    policy: RecoveryPolicy,
    state: Mutex<TrackerState>,
}

impl RecoveryTracker {
    /// Creates a tracker for `policy`.
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// The policy in effect.
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Records a manifest failure.
    pub fn record_failure(&self, fault: &ManifestFault, now: Instant) -> FailureNote {
        let mut state = self.state.lock();

        if fault.is_truncation() {
            state.truncations.push_back(now);
        }
        let window = self.policy.pattern_window;
        while let Some(&first) = state.truncations.front() {
            if now.saturating_duration_since(first) > window {
                state.truncations.pop_front();
            } else {
                break;
            }
        }

        let repeated = match &state.last_failure {
            Some((previous, at)) => {
                previous.same_kind(fault)
                    && now.saturating_duration_since(*at) < self.policy.failure_backoff
            }
            None => false,
        };
        if repeated {
            state.suppressed += 1;
        } else {
            state.suppressed = 0;
            state.last_failure = Some((fault.clone(), now));
        }

        FailureNote {
            repeated,
            suppressed: state.suppressed,
        }
    }

    /// Returns true if enough truncation-class failures happened inside the
    /// pattern window to suspect a systematic problem.
    pub fn corruption_pattern_detected(&self, now: Instant) -> bool {
        let state = self.state.lock();
        let window = self.policy.pattern_window;
        state
            .truncations
            .iter()
            .filter(|&&at| now.saturating_duration_since(at) <= window)
            .count()
            >= self.policy.pattern_threshold
    }

    /// Returns true if an automatic reset may run now.
    pub fn reset_allowed(&self, now: Instant) -> bool {
        match self.state.lock().last_reset {
            Some(at) => now.saturating_duration_since(at) >= self.policy.reset_cooldown,
            None => true,
        }
    }

    /// Records that a reset happened.
    pub fn note_reset(&self, now: Instant) {
        let mut state = self.state.lock();
        state.last_reset = Some(now);
        state.last_failure = None;
        state.suppressed = 0;
    }
}

/// Tombstones the root and deletes every chunk stamped with its budget id.
///
/// The tombstone goes into the first batch so readers see "no data" even
/// if a later batch of deletes fails.
pub(crate) fn reset_root(ctx: &EngineContext) -> SyncResult<ResetOutcome> {
    let chunks = ctx.query_chunks()?;
    let deleted_at = now_millis();
    let max_ops = ctx.store.max_batch_ops().max(1);

    let mut batch = WriteBatch::new();
    batch.set(
        ctx.root_path.clone(),
        serde_json::to_value(Tombstone::new(deleted_at))?,
    );

    let mut chunks_deleted = 0;
    for (path, _) in chunks {
        if batch.len() == max_ops {
            ctx.store.commit(std::mem::take(&mut batch))?;
        }
        batch.delete(path);
        chunks_deleted += 1;
    }
    ctx.store.commit(batch)?;

    warn!(budget_id = ctx.log_id(), chunks_deleted, "remote root reset");
    Ok(ResetOutcome {
        success: true,
        local_only: false,
        chunks_deleted,
        deleted_at,
    })
}

/// Deletes chunk documents the current manifest does not reference.
///
/// Refuses to run when the manifest cannot be resolved, since the set of
/// live chunks is then unknown.
pub(crate) fn collect_garbage(ctx: &EngineContext) -> SyncResult<usize> {
    let referenced: BTreeSet<ChunkId> = match resolve_root(ctx)? {
        RootState::Live(manifest) => manifest.referenced(),
        RootState::Absent | RootState::Tombstoned => BTreeSet::new(),
        RootState::Faulty { fault, .. } => {
            return Err(SyncError::manifest_unreadable(format!(
                "refusing to collect garbage: {fault}"
            )));
        }
    };

    let max_ops = ctx.store.max_batch_ops().max(1);
    let mut batch = WriteBatch::new();
    let mut removed = 0;
    for (path, _) in ctx.query_chunks()? {
        if referenced.contains(&ChunkId::from_raw(path.id())) {
            continue;
        }
        if batch.len() == max_ops {
            ctx.store.commit(std::mem::take(&mut batch))?;
        }
        batch.delete(path);
        removed += 1;
    }
    if !batch.is_empty() {
        ctx.store.commit(batch)?;
    }
    info!(budget_id = ctx.log_id(), removed, "collected unreferenced chunks");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tracker() -> RecoveryTracker {
        RecoveryTracker::new(RecoveryPolicy::default())
    }

    #[test]
    fn repeated_failures_are_noted() {
        let t = tracker();
        let start = Instant::now();

        let first = t.record_failure(&ManifestFault::Corrupted, start);
        assert!(!first.repeated);

        let second = t.record_failure(&ManifestFault::Corrupted, start + Duration::from_secs(10));
        assert!(second.repeated);
        assert_eq!(second.suppressed, 1);

        let other = t.record_failure(&ManifestFault::Truncated, start + Duration::from_secs(20));
        assert!(!other.repeated);

        let later = t.record_failure(&ManifestFault::Truncated, start + Duration::from_secs(400));
        assert!(!later.repeated);
    }

    #[test]
    fn truncation_pattern_needs_two_within_window() {
        let t = tracker();
        let start = Instant::now();

        t.record_failure(&ManifestFault::Truncated, start);
        assert!(!t.corruption_pattern_detected(start));

        t.record_failure(&ManifestFault::Truncated, start + Duration::from_secs(60));
        assert!(t.corruption_pattern_detected(start + Duration::from_secs(60)));

        // Both age out of the ten minute window.
        assert!(!t.corruption_pattern_detected(start + Duration::from_secs(11 * 60)));
    }

    #[test]
    fn other_faults_do_not_form_a_pattern() {
        let t = tracker();
        let start = Instant::now();
        t.record_failure(&ManifestFault::Corrupted, start);
        t.record_failure(&ManifestFault::Malformed("x".into()), start);
        assert!(!t.corruption_pattern_detected(start));
    }

    #[test]
    fn reset_cooldown() {
        let t = tracker();
        let start = Instant::now();
        assert!(t.reset_allowed(start));

        t.note_reset(start);
        assert!(!t.reset_allowed(start + Duration::from_secs(60)));
        assert!(t.reset_allowed(start + Duration::from_secs(5 * 60)));
    }
}
