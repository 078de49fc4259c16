//! Atomic write batches.

use crate::path::DocumentPath;
use crate::store::Document;

/// A single staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create or fully replace a document.
    Set {
        /// Target path.
        path: DocumentPath,
        /// New document body.
        document: Document,
    },
    /// Remove a document. Removing a missing document is not an error.
    Delete {
        /// Target path.
        path: DocumentPath,
    },
}

impl BatchOp {
    /// Returns the path this operation targets.
    #[must_use]
    pub fn path(&self) -> &DocumentPath {
        match self {
            BatchOp::Set { path, .. } | BatchOp::Delete { path } => path,
        }
    }
}

/// An ordered set of writes committed as one indivisible unit.
///
/// Operations are applied in staging order, so a later write to the same
/// path wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a create-or-replace.
    pub fn set(&mut self, path: DocumentPath, document: Document) -> &mut Self {
        self.ops.push(BatchOp::Set { path, document });
        self
    }

    /// Stages a delete.
    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(BatchOp::Delete { path });
        self
    }

    /// Number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Staged operations in order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consumes the batch, returning its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
