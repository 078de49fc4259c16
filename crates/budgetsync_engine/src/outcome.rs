//! Results reported by engine operations.

use crate::chunk_codec::ChunkFault;
use crate::manifest::ManifestFault;
use budgetsync_protocol::{BudgetData, ChunkId, TrackedField};
use std::collections::BTreeMap;
use std::time::Duration;

/// Result of `save_to_cloud`.
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    /// Whether a generation was committed.
    pub success: bool,
    /// The remote store was not reachable; nothing was written.
    pub local_only: bool,
    /// Generation stamp of the committed manifest.
    pub generation: u64,
    /// Chunks written per field.
    pub chunk_counts: BTreeMap<TrackedField, usize>,
    /// Documents written, manifest included.
    pub documents_written: usize,
    /// Unreferenced chunks of earlier generations deleted in the same commit.
    pub orphans_pruned: usize,
    /// Number of times an oversized chunk was halved.
    pub bisections: u32,
    /// Wall-clock duration of the save.
    pub duration: Duration,
}

impl SaveOutcome {
    pub(crate) fn local_only() -> Self {
        Self {
            local_only: true,
            ..Self::default()
        }
    }

    /// Total chunks across all fields.
    pub fn total_chunks(&self) -> usize {
        self.chunk_counts.values().sum()
    }
}

/// A listed chunk the loader could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChunk {
    /// Field the chunk was listed under.
    pub field: TrackedField,
    /// Listed chunk id.
    pub chunk_id: ChunkId,
    /// Why it was skipped.
    pub fault: ChunkFault,
}

/// Non-fatal findings of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of chunks decoded.
    pub chunks_loaded: usize,
    /// Listed chunks that were skipped.
    pub skipped: Vec<SkippedChunk>,
    /// Chunks whose generation stamp differs from the manifest's. Their
    /// items are still merged, so a non-empty list means the returned data
    /// mixes records of more than one generation.
    pub stale: Vec<ChunkId>,
    /// Fields that came back with fewer records than the manifest counted.
    pub short_fields: Vec<TrackedField>,
}

impl LoadReport {
    /// Returns true if every listed chunk loaded cleanly.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.stale.is_empty() && self.short_fields.is_empty()
    }

    /// Returns true if the loaded data includes chunks of another
    /// generation, as after two clients raced on the same root.
    pub fn is_mixed_generation(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// Result of `load_from_cloud`.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Reconstructed data, or `None` if there is nothing usable remotely.
    pub data: Option<BudgetData>,
    /// Generation stamp of the manifest that was read.
    pub last_modified: Option<u64>,
    /// The remote root was reset because its manifest was corrupted.
    pub recovered: bool,
    /// The remote store was not reachable.
    pub local_only: bool,
    /// Manifest corruption that was detected, if any.
    pub corruption: Option<ManifestFault>,
    /// Chunk-level findings.
    pub report: LoadReport,
}

impl LoadOutcome {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn local_only() -> Self {
        Self {
            local_only: true,
            ..Self::default()
        }
    }

    pub(crate) fn corrupted(fault: ManifestFault, recovered: bool) -> Self {
        Self {
            recovered,
            corruption: Some(fault),
            ..Self::default()
        }
    }

    /// Returns true if data was reconstructed.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Result of `reset_cloud_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Whether the root was tombstoned.
    pub success: bool,
    /// The remote store was not reachable.
    pub local_only: bool,
    /// Chunk documents deleted.
    pub chunks_deleted: usize,
    /// Timestamp written into the tombstone.
    pub deleted_at: u64,
}

impl ResetOutcome {
    pub(crate) fn local_only() -> Self {
        Self {
            local_only: true,
            ..Self::default()
        }
    }
}

/// Result of `collect_garbage`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcOutcome {
    /// Unreferenced chunk documents deleted.
    pub removed: usize,
    /// The remote store was not reachable.
    pub local_only: bool,
}

impl GcOutcome {
    pub(crate) fn local_only() -> Self {
        Self {
            removed: 0,
            local_only: true,
        }
    }
}
