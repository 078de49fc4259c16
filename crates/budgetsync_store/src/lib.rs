//! # BudgetSync Store
//!
//! Hierarchical document store abstraction for BudgetSync.
//!
//! This crate provides:
//! - [`DocumentStore`] trait: a size-limited hierarchical document store
//! - [`WriteBatch`]: atomic multi-document writes
//! - [`InMemoryDocumentStore`]: in-memory store for tests
//! - [`FileDocumentStore`]: directory-backed store with crash-safe commits
//!
//! ## Design Principles
//!
//! - Stores are opaque JSON document holders; they never interpret payloads
//! - Every store enforces a hard per-document size ceiling
//! - Batches are all-or-nothing
//!
//! ## Example
//!
//! ```rust
//! use budgetsync_store::{CollectionPath, DocumentStore, InMemoryDocumentStore};
//! use serde_json::json;
//!
//! let store = InMemoryDocumentStore::new();
//! let budget = CollectionPath::root("budgets").unwrap().doc("demo").unwrap();
//! store.put(&budget, json!({"lastModified": 1})).unwrap();
//! assert_eq!(store.get(&budget).unwrap().unwrap()["lastModified"], 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod error;
mod file;
mod map;
mod memory;
mod path;
mod store;

pub use batch::{BatchOp, WriteBatch};
pub use error::{StoreError, StoreResult};
pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use path::{CollectionPath, DocumentPath};
pub use store::{Document, DocumentStore, DEFAULT_MAX_BATCH_OPS, DEFAULT_MAX_DOCUMENT_SIZE};
