//! # BudgetSync Protocol
//!
//! Document model shared by BudgetSync writers and readers.
//!
//! This crate provides:
//! - [`TrackedField`] and [`BudgetData`]: the synchronized dataset
//! - [`ChunkDocument`] and [`ChunkEnvelope`]: one encrypted slice of a field
//! - [`Manifest`] and [`ManifestDocument`]: the authoritative chunk index
//! - [`Tombstone`]: the marker a reset leaves behind
//!
//! This is a pure data crate with no I/O and no cryptography.
//!
//! ## Storage Layout
//!
//! ```text
//! budgets/{budgetId}                    # ManifestDocument or Tombstone
//! budgets/{budgetId}/chunks/{chunkId}   # ChunkDocument
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chunk;
mod data;
mod field;
mod manifest;

pub use chunk::{ChunkDocument, ChunkEnvelope, ChunkId, EncryptedPayload, CHUNKS_COLLECTION};
pub use data::{BudgetData, Record};
pub use field::{TrackedField, UnknownField};
pub use manifest::{
    AuthorInfo, AuthorMeta, ChunkMap, Manifest, ManifestDocument, ManifestMetadata, RootDocument,
    Tombstone, DEFAULT_USER_COLOR, DEFAULT_USER_NAME, MANIFEST_TYPE,
};
