//! Manifest, manifest document and tombstone.

use crate::chunk::{ChunkId, EncryptedPayload};
use crate::field::TrackedField;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Value of the `type` marker on manifests.
pub const MANIFEST_TYPE: &str = "budget_manifest";

/// Display name used when the author is unknown.
pub const DEFAULT_USER_NAME: &str = "Anonymous";

/// Display color used when the author has none.
pub const DEFAULT_USER_COLOR: &str = "#a855f7";

/// Field name → ordered chunk ids.
pub type ChunkMap = BTreeMap<String, Vec<ChunkId>>;

/// Who produced a save, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorMeta {
    /// Display name.
    pub user_name: Option<String>,
    /// Display color.
    pub user_color: Option<String>,
}

impl AuthorMeta {
    /// An author with no name or color.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An author with a display name and color.
    #[must_use]
    pub fn new(user_name: impl Into<String>, user_color: impl Into<String>) -> Self {
        Self {
            user_name: Some(user_name.into()),
            user_color: Some(user_color.into()),
        }
    }
}

/// Author information recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    /// Display name.
    pub user_name: String,
    /// Display color.
    pub user_color: String,
    /// When the author last saved (epoch millis).
    pub last_seen: u64,
}

impl AuthorInfo {
    /// Fills in defaults for whatever `meta` leaves out.
    #[must_use]
    pub fn from_meta(meta: &AuthorMeta, last_seen: u64) -> Self {
        Self {
            user_name: meta
                .user_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()),
            user_color: meta
                .user_color
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_USER_COLOR.to_owned()),
            last_seen,
        }
    }
}

impl Default for AuthorInfo {
    fn default() -> Self {
        Self::from_meta(&AuthorMeta::anonymous(), 0)
    }
}

/// Advisory manifest metadata. Never used for reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestMetadata {
    /// Author of the generation.
    pub current_user: AuthorInfo,
    /// Record count per field at save time.
    pub stats: BTreeMap<String, usize>,
    /// Number of chunk documents in the generation.
    pub total_documents: usize,
    /// When the generation was built (epoch millis).
    pub created_at: u64,
}

/// The authoritative index of one budget's chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always [`MANIFEST_TYPE`].
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Owning budget.
    pub budget_id: String,
    /// Generation stamp (epoch millis).
    pub last_modified: u64,
    /// Ordered chunk ids per field. Every tracked field is present.
    pub chunk_map: ChunkMap,
    /// Advisory metadata.
    #[serde(default)]
    pub metadata: ManifestMetadata,
}

impl Manifest {
    /// Chunk ids listed for `field`, in order. Empty if absent.
    #[must_use]
    pub fn chunks_for(&self, field: TrackedField) -> &[ChunkId] {
        self.chunk_map
            .get(field.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of chunk ids across all fields.
    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.chunk_map.values().map(Vec::len).sum()
    }

    /// Every chunk id the manifest references.
    #[must_use]
    pub fn referenced(&self) -> BTreeSet<ChunkId> {
        self.chunk_map.values().flatten().cloned().collect()
    }
}

/// The stored manifest at `budgets/{budgetId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    /// Cleartext [`MANIFEST_TYPE`] marker.
    #[serde(rename = "type", default)]
    pub doc_type: String,
    /// Encrypted [`Manifest`]. Absent only on damaged documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<EncryptedPayload>,
    /// Cleartext copy of the generation stamp.
    #[serde(default)]
    pub last_modified: u64,
    /// Cleartext chunk count.
    #[serde(default)]
    pub chunk_count: usize,
    /// Check value of the key the manifest was encrypted with.
    /// Absent on manifests from older writers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_check: Option<String>,
}

/// Marker left at the manifest path by a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    /// Always true.
    pub deleted: bool,
    /// When the reset happened (epoch millis).
    pub deleted_at: u64,
}

impl Tombstone {
    /// A tombstone stamped `deleted_at`.
    #[must_use]
    pub fn new(deleted_at: u64) -> Self {
        Self {
            deleted: true,
            deleted_at,
        }
    }
}

/// What can be found at a budget's root path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootDocument {
    /// A live manifest.
    Manifest(ManifestDocument),
    /// The budget was reset.
    Tombstone(Tombstone),
}

impl RootDocument {
    /// Classifies a raw root document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is neither a tombstone nor shaped
    /// like a manifest document.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("deleted").and_then(Value::as_bool) == Some(true) {
            let deleted_at = value.get("deletedAt").and_then(Value::as_u64).unwrap_or(0);
            return Ok(Self::Tombstone(Tombstone::new(deleted_at)));
        }
        serde_json::from_value(value).map(Self::Manifest)
    }
}
