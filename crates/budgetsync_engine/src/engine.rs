//! The chunked sync engine facade.

use crate::auth::Authenticator;
use crate::config::SyncConfig;
use crate::context::EngineContext;
use crate::error::{SyncError, SyncResult};
use crate::loader::{load, LoadStep};
use crate::manifest::ManifestFault;
use crate::outcome::{GcOutcome, LoadOutcome, ResetOutcome, SaveOutcome};
use crate::recovery::{collect_garbage, reset_root, RecoveryTracker};
use crate::serializer::WriteSerializer;
use budgetsync_crypto::{Cipher, EncryptionKey};
use budgetsync_protocol::{AuthorMeta, BudgetData};
use budgetsync_store::{Document, DocumentStore};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Statistics about engine operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Generations committed.
    pub saves_completed: u64,
    /// Saves that failed.
    pub saves_failed: u64,
    /// Loads that returned data.
    pub loads_completed: u64,
    /// Chunk documents written.
    pub chunks_written: u64,
    /// Chunks skipped while loading.
    pub chunks_skipped: u64,
    /// Orphaned chunks deleted, by pruning or garbage collection.
    pub orphans_removed: u64,
    /// Chunk bisections performed.
    pub bisections: u64,
    /// Confirmed manifest corruptions detected. Key mismatches and
    /// unverifiable manifests are not counted.
    pub corruptions_detected: u64,
    /// Resets performed, automatic or explicit.
    pub resets: u64,
    /// Operations skipped because authentication was unavailable.
    pub local_only: u64,
    /// Time of the last committed generation.
    pub last_save_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Chunked, encrypted synchronization of one budget.
///
/// One engine serves one `budgetId`. It is `Send + Sync`; share it by
/// reference or `Arc`. Saves, resets and garbage collection are
/// serialized per instance; loads run concurrently.
pub struct ChunkedSyncEngine {
    ctx: EngineContext,
    auth: Arc<dyn Authenticator>,
    serializer: WriteSerializer,
    tracker: RecoveryTracker,
    last_generation: AtomicU64,
    stats: RwLock<SyncStats>,
}

impl ChunkedSyncEngine {
    /// Creates an engine for `budget_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if `budget_id` is empty and
    /// `InvalidConfig` if `config` does not validate.
    pub fn initialize(
        budget_id: impl Into<String>,
        key: EncryptionKey,
        store: Arc<dyn DocumentStore>,
        cipher: Arc<dyn Cipher>,
        auth: Arc<dyn Authenticator>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let tracker = RecoveryTracker::new(config.recovery.clone());
        let ctx = EngineContext::new(budget_id.into(), key, store, cipher, config)?;
        info!(
            budget_id = ctx.log_id(),
            hard_limit = ctx.hard_limit,
            budget = ctx.effective_budget(),
            "sync engine initialized"
        );
        Ok(Self {
            ctx,
            auth,
            serializer: WriteSerializer::new(),
            tracker,
            last_generation: AtomicU64::new(0),
            stats: RwLock::new(SyncStats::default()),
        })
    }

    /// The budget this engine serves.
    pub fn budget_id(&self) -> &str {
        &self.ctx.budget_id
    }

    /// The configuration in effect.
    pub fn config(&self) -> &SyncConfig {
        &self.ctx.config
    }

    /// Current statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The write serializer, for observing in-flight state.
    pub fn serializer(&self) -> &WriteSerializer {
        &self.serializer
    }

    /// The recovery tracker.
    pub fn recovery(&self) -> &RecoveryTracker {
        &self.tracker
    }

    /// Writes `data` as a new generation in one atomic commit.
    ///
    /// Returns a local-only outcome if authentication is unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if an item or chunk cannot fit the store, or if
    /// encryption or the commit fails. Nothing is written in that case.
    pub fn save_to_cloud(&self, data: &BudgetData, author: &AuthorMeta) -> SyncResult<SaveOutcome> {
        self.serializer.execute(|| {
            if !self.authenticated("save") {
                return Ok(SaveOutcome::local_only());
            }
            let start = Instant::now();
            let previous = self.last_generation.load(Ordering::SeqCst);

            match crate::writer::write_generation(&self.ctx, data, author, previous) {
                Ok(summary) => {
                    self.last_generation
                        .fetch_max(summary.generation, Ordering::SeqCst);
                    let mut stats = self.stats.write();
                    stats.saves_completed += 1;
                    stats.chunks_written += summary.chunk_counts.values().sum::<usize>() as u64;
                    stats.orphans_removed += summary.orphans_pruned as u64;
                    stats.bisections += u64::from(summary.bisections);
                    stats.last_save_time = Some(Instant::now());
                    stats.last_error = None;

                    Ok(SaveOutcome {
                        success: true,
                        local_only: false,
                        generation: summary.generation,
                        chunk_counts: summary.chunk_counts,
                        documents_written: summary.documents_written,
                        orphans_pruned: summary.orphans_pruned,
                        bisections: summary.bisections,
                        duration: start.elapsed(),
                    })
                }
                Err(e) => {
                    let mut stats = self.stats.write();
                    stats.saves_failed += 1;
                    stats.last_error = Some(e.to_string());
                    Err(e)
                }
            }
        })
    }

    /// Reads and reconstructs the current generation.
    ///
    /// A missing or tombstoned root yields no data. A corrupted manifest
    /// resets the root when the recovery policy allows it.
    ///
    /// # Errors
    ///
    /// Returns `KeyMismatch` if the manifest was written with another key,
    /// `ManifestUnreadable` if it cannot be decrypted and the cause cannot
    /// be established, or a store error if reading fails.
    pub fn load_from_cloud(&self) -> SyncResult<LoadOutcome> {
        if !self.authenticated("load") {
            return Ok(LoadOutcome::local_only());
        }

        match load(&self.ctx)? {
            LoadStep::Empty => Ok(LoadOutcome::empty()),
            LoadStep::Loaded {
                data,
                last_modified,
                report,
            } => {
                self.last_generation.fetch_max(last_modified, Ordering::SeqCst);
                let mut stats = self.stats.write();
                stats.loads_completed += 1;
                stats.chunks_skipped += report.skipped.len() as u64;
                Ok(LoadOutcome {
                    data: Some(data),
                    last_modified: Some(last_modified),
                    report,
                    ..LoadOutcome::default()
                })
            }
            LoadStep::Unreadable { fault, document } => {
                self.handle_manifest_fault(fault, document)
            }
        }
    }

    /// Tombstones the root and deletes all of its chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the reset.
    pub fn reset_cloud_data(&self) -> SyncResult<ResetOutcome> {
        self.serializer.execute(|| {
            if !self.authenticated("reset") {
                return Ok(ResetOutcome::local_only());
            }
            let outcome = reset_root(&self.ctx)?;
            self.tracker.note_reset(Instant::now());
            self.stats.write().resets += 1;
            Ok(outcome)
        })
    }

    /// Deletes chunk documents that the current manifest does not list.
    ///
    /// # Errors
    ///
    /// Returns `ManifestUnreadable` if the manifest cannot be resolved.
    pub fn collect_garbage(&self) -> SyncResult<GcOutcome> {
        self.serializer.execute(|| {
            if !self.authenticated("collect garbage") {
                return Ok(GcOutcome::local_only());
            }
            let removed = collect_garbage(&self.ctx)?;
            self.stats.write().orphans_removed += removed as u64;
            Ok(GcOutcome {
                removed,
                local_only: false,
            })
        })
    }

    fn authenticated(&self, operation: &str) -> bool {
        if self.auth.ensure_authenticated() {
            return true;
        }
        debug!(
            budget_id = self.ctx.log_id(),
            operation, "authentication unavailable, staying local"
        );
        self.stats.write().local_only += 1;
        false
    }

    /// `judged` is the root document exactly as the fault was read from.
    fn handle_manifest_fault(
        &self,
        fault: ManifestFault,
        judged: Document,
    ) -> SyncResult<LoadOutcome> {
        let now = Instant::now();
        let note = self.tracker.record_failure(&fault, now);
        if fault.is_confirmed_corruption() {
            self.stats.write().corruptions_detected += 1;
        }

        match fault {
            ManifestFault::WrongKey => {
                warn!(
                    budget_id = self.ctx.log_id(),
                    "remote manifest was written with a different key"
                );
                return Err(SyncError::KeyMismatch);
            }
            ManifestFault::Ambiguous => {
                warn!(
                    budget_id = self.ctx.log_id(),
                    "manifest cannot be decrypted and has no key check, leaving it untouched"
                );
                return Err(SyncError::manifest_unreadable(fault.to_string()));
            }
            _ => {}
        }

        if note.repeated {
            debug!(
                budget_id = self.ctx.log_id(),
                %fault,
                suppressed = note.suppressed,
                "manifest still corrupted"
            );
        } else {
            error!(budget_id = self.ctx.log_id(), %fault, "manifest corrupted");
        }
        if self.tracker.corruption_pattern_detected(now) {
            warn!(
                budget_id = self.ctx.log_id(),
                "repeated truncated manifests, check the writer"
            );
        }

        let policy = self.tracker.policy();
        if !policy.auto_reset {
            return Ok(LoadOutcome::corrupted(fault, false));
        }
        if !self.tracker.reset_allowed(now) {
            debug!(
                budget_id = self.ctx.log_id(),
                "reset cooldown active, not resetting again"
            );
            return Ok(LoadOutcome::corrupted(fault, false));
        }

        // The judgement was made outside the write gate. Only reset if the
        // root still holds the exact document that was judged.
        let reset = self.serializer.execute(|| -> SyncResult<Option<ResetOutcome>> {
            let current = self.ctx.store.get(&self.ctx.root_path)?;
            if current.as_ref() != Some(&judged) {
                return Ok(None);
            }
            reset_root(&self.ctx).map(Some)
        })?;
        if reset.is_none() {
            info!(
                budget_id = self.ctx.log_id(),
                "root changed since it was judged corrupted, not resetting"
            );
            return Ok(LoadOutcome::corrupted(fault, false));
        }
        self.tracker.note_reset(now);
        self.stats.write().resets += 1;
        Ok(LoadOutcome::corrupted(fault, true))
    }
}

impl std::fmt::Debug for ChunkedSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedSyncEngine")
            .field("budget_id", &self.ctx.budget_id)
            .field("hard_limit", &self.ctx.hard_limit)
            .field("last_generation", &self.last_generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
