//! Ordered document map shared by the bundled stores.

use crate::batch::{BatchOp, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::path::{CollectionPath, DocumentPath};
use crate::store::Document;
use budgetsync_codec::estimate_size;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct DocumentMap {
    documents: BTreeMap<DocumentPath, Document>,
}

impl DocumentMap {
    pub(crate) fn from_documents(documents: BTreeMap<DocumentPath, Document>) -> Self {
        Self { documents }
    }

    pub(crate) fn documents(&self) -> &BTreeMap<DocumentPath, Document> {
        &self.documents
    }

    pub(crate) fn get(&self, path: &DocumentPath) -> Option<&Document> {
        self.documents.get(path)
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub(crate) fn query_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Vec<(DocumentPath, Document)> {
        self.documents
            .iter()
            .filter(|(path, doc)| collection.contains(path) && doc.get(field) == Some(value))
            .map(|(path, doc)| (path.clone(), doc.clone()))
            .collect()
    }

    /// Applies already-validated operations in order.
    pub(crate) fn apply(&mut self, ops: Vec<BatchOp>) {
        for op in ops {
            match op {
                BatchOp::Set { path, document } => {
                    self.documents.insert(path, document);
                }
                BatchOp::Delete { path } => {
                    self.documents.remove(&path);
                }
            }
        }
    }
}

/// Checks every operation of a batch against the store limits.
pub(crate) fn validate_batch(
    batch: &WriteBatch,
    max_document_size: usize,
    max_batch_ops: usize,
) -> StoreResult<()> {
    if batch.len() > max_batch_ops {
        return Err(StoreError::BatchTooLarge {
            ops: batch.len(),
            limit: max_batch_ops,
        });
    }
    for op in batch.ops() {
        if let BatchOp::Set { path, document } = op {
            validate_document(path, document, max_document_size)?;
        }
    }
    Ok(())
}

pub(crate) fn validate_document(
    path: &DocumentPath,
    document: &Document,
    max_document_size: usize,
) -> StoreResult<()> {
    if !document.is_object() {
        return Err(StoreError::Serialization(format!(
            "document {path} is not a JSON object"
        )));
    }
    let size = estimate_size(document).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if size > max_document_size {
        return Err(StoreError::DocumentTooLarge {
            path: path.to_string(),
            size,
            limit: max_document_size,
        });
    }
    Ok(())
}
