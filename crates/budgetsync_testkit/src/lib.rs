//! # BudgetSync Testkit
//!
//! Test utilities for BudgetSync.
//!
//! This crate provides:
//! - Realistic record fixtures and engine harnesses
//! - Property-based test generators using proptest
//! - Store probes that observe commit overlap and inject read faults
//! - Helpers that plant damaged manifests and chunks
//! - Cross-crate integration helpers and stress utilities
//!
//! ## Usage
//!
//! ```rust
//! use budgetsync_testkit::prelude::*;
//!
//! let harness = TestEngine::memory();
//! let data = sample_budget(100);
//! harness.save(&data);
//! assert_eq!(harness.load().data, Some(data));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod probe;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::probe::*;
    pub use crate::stress::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use probe::*;
pub use stress::*;
