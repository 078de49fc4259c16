//! # BudgetSync Engine
//!
//! Chunked, encrypted synchronization of budget data to a size-limited
//! hierarchical document store.
//!
//! This crate provides:
//! - [`ChunkedSyncEngine`]: save, load, reset and garbage collection of one budget
//! - [`Chunker`]: size-aware partitioning of record arrays
//! - [`RecoveryTracker`]: manifest corruption tracking and reset cooldown
//! - [`WriteSerializer`]: one mutating operation at a time
//!
//! ## Layout
//!
//! Each budget lives at `{root}/{budgetId}`. The root document is either an
//! encrypted manifest or a deletion tombstone. Chunk documents live in the
//! `chunks` subcollection and are only reachable through the manifest's
//! chunk map. A save writes every chunk and the manifest in one batch, so
//! readers see either the previous generation or the new one.
//!
//! ## Example
//!
//! ```rust
//! use budgetsync_crypto::{AesGcmCipher, EncryptionKey};
//! use budgetsync_engine::{ChunkedSyncEngine, StaticAuthenticator, SyncConfig};
//! use budgetsync_protocol::{AuthorMeta, BudgetData, TrackedField};
//! use budgetsync_store::InMemoryDocumentStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let engine = ChunkedSyncEngine::initialize(
//!     "budget-1",
//!     EncryptionKey::generate(),
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(AesGcmCipher::new()),
//!     Arc::new(StaticAuthenticator::authenticated()),
//!     SyncConfig::default(),
//! )
//! .unwrap();
//!
//! let data = BudgetData::new()
//!     .with_field(TrackedField::Transactions, vec![json!({"id": "t1", "amount": -12.5})]);
//! let saved = engine.save_to_cloud(&data, &AuthorMeta::anonymous()).unwrap();
//! assert!(saved.success);
//!
//! let loaded = engine.load_from_cloud().unwrap();
//! assert_eq!(loaded.data, Some(data));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod chunk_codec;
mod chunker;
mod config;
mod context;
mod engine;
mod error;
mod loader;
mod manifest;
mod outcome;
mod payload;
mod recovery;
mod serializer;
mod writer;

pub use auth::{Authenticator, StaticAuthenticator};
pub use chunk_codec::{ChunkFault, DecodedChunk};
pub use chunker::Chunker;
pub use config::{RecoveryPolicy, SyncConfig};
pub use engine::{ChunkedSyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use manifest::{build_manifest, ManifestFault};
pub use outcome::{GcOutcome, LoadOutcome, LoadReport, ResetOutcome, SaveOutcome, SkippedChunk};
pub use recovery::{FailureNote, RecoveryTracker};
pub use serializer::WriteSerializer;
