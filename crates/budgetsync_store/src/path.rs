//! Hierarchical document and collection paths.
//!
//! Paths alternate collection and document segments, so a document path
//! always has an even number of segments and a collection path an odd
//! number: `budgets/{budgetId}` is a document, `budgets/{budgetId}/chunks`
//! is a collection, `budgets/{budgetId}/chunks/{chunkId}` is a document.

use crate::error::{StoreError, StoreResult};
use std::fmt;

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

/// Path of a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

fn validate_segment(segment: &str) -> StoreResult<()> {
    if segment.is_empty() {
        return Err(StoreError::InvalidPath("empty path segment".into()));
    }
    if segment.contains('/') {
        return Err(StoreError::InvalidPath(format!(
            "segment {segment:?} contains '/'"
        )));
    }
    Ok(())
}

impl DocumentPath {
    /// Parses a slash-separated document path.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment is empty or the segment count is odd.
    pub fn parse(path: &str) -> StoreResult<Self> {
        let segments: Vec<String> = path.split('/').map(str::to_owned).collect();
        for segment in &segments {
            validate_segment(segment)?;
        }
        if segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(format!(
                "{path:?} names a collection, not a document"
            )));
        }
        Ok(Self { segments })
    }

    /// Returns the final segment (the document id).
    #[must_use]
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns the collection containing this document.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Returns a subcollection nested under this document.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid segment.
    pub fn collection(&self, name: &str) -> StoreResult<CollectionPath> {
        validate_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Ok(CollectionPath { segments })
    }
}

impl CollectionPath {
    /// Creates a top-level collection path.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid segment.
    pub fn root(name: &str) -> StoreResult<Self> {
        validate_segment(name)?;
        Ok(Self {
            segments: vec![name.to_owned()],
        })
    }

    /// Returns the path of the document `id` in this collection.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a valid segment.
    pub fn doc(&self, id: &str) -> StoreResult<DocumentPath> {
        validate_segment(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_owned());
        Ok(DocumentPath { segments })
    }

    /// Returns true if `path` is a direct child of this collection.
    #[must_use]
    pub fn contains(&self, path: &DocumentPath) -> bool {
        path.segments.len() == self.segments.len() + 1
            && path.segments[..self.segments.len()] == self.segments[..]
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_nested_paths() {
        let budgets = CollectionPath::root("budgets").unwrap();
        let root = budgets.doc("b-123").unwrap();
        let chunks = root.collection("chunks").unwrap();
        let chunk = chunks.doc("transactions-00000").unwrap();

        assert_eq!(root.to_string(), "budgets/b-123");
        assert_eq!(chunk.to_string(), "budgets/b-123/chunks/transactions-00000");
        assert_eq!(chunk.id(), "transactions-00000");
        assert_eq!(chunk.parent(), chunks);
        assert!(chunks.contains(&chunk));
        assert!(!budgets.contains(&chunk));
        assert!(budgets.contains(&root));
    }

    #[test]
    fn parse_round_trips() {
        let path = DocumentPath::parse("budgets/b/chunks/bills-00002").unwrap();
        assert_eq!(path.to_string(), "budgets/b/chunks/bills-00002");
    }

    #[test]
    fn parse_rejects_collection_paths() {
        assert!(DocumentPath::parse("budgets").is_err());
        assert!(DocumentPath::parse("budgets/b/chunks").is_err());
    }

    #[test]
    fn empty_and_slashed_segments_rejected() {
        assert!(DocumentPath::parse("budgets//x/y").is_err());
        let budgets = CollectionPath::root("budgets").unwrap();
        assert!(budgets.doc("").is_err());
        assert!(budgets.doc("a/b").is_err());
    }
}
