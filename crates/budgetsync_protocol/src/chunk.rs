//! Chunk identifiers and chunk documents.

use crate::data::Record;
use crate::field::TrackedField;
use budgetsync_codec::EncodedBytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subcollection holding the chunk documents of a budget.
pub const CHUNKS_COLLECTION: &str = "chunks";

/// Identifier of a chunk document: `{field}-{index:05}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Builds the id of chunk `index` of `field`.
    #[must_use]
    pub fn new(field: TrackedField, index: u32) -> Self {
        Self(format!("{}-{index:05}", field.as_str()))
    }

    /// Wraps an id read from storage without validating it.
    #[must_use]
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Splits a well-formed id into its field and index.
    #[must_use]
    pub fn parse(&self) -> Option<(TrackedField, u32)> {
        let (field, index) = self.0.rsplit_once('-')?;
        if index.len() < 5 || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((field.parse().ok()?, index.parse().ok()?))
    }

    /// Returns the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ciphertext and IV as stored in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Ciphertext.
    pub data: EncodedBytes,
    /// Initialization vector.
    pub iv: EncodedBytes,
}

impl EncryptedPayload {
    /// Wraps raw ciphertext and IV in the current (base64) form.
    #[must_use]
    pub fn from_bytes(data: &[u8], iv: &[u8]) -> Self {
        Self {
            data: EncodedBytes::from_bytes(data),
            iv: EncodedBytes::from_bytes(iv),
        }
    }
}

/// Plaintext encrypted into a chunk document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkEnvelope {
    /// Field the items belong to.
    pub chunk_type: String,
    /// Zero-based position of the chunk within its field.
    pub chunk_index: u32,
    /// Number of chunks the field was split into.
    pub total_chunks: u32,
    /// The items, in order.
    pub data: Vec<Record>,
    /// Owning budget.
    pub budget_id: String,
    /// Generation stamp.
    pub last_modified: u64,
}

/// A stored chunk document at `budgets/{budgetId}/chunks/{chunkId}`.
///
/// Everything but `encryptedData` is cleartext and advisory; readers
/// trust the encrypted envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDocument {
    /// Field the chunk belongs to.
    pub chunk_type: String,
    /// Zero-based position of the chunk within its field.
    pub chunk_index: u32,
    /// Number of chunks the field was split into.
    pub total_chunks: u32,
    /// Encrypted [`ChunkEnvelope`].
    pub encrypted_data: EncryptedPayload,
    /// Owning budget. Also the field chunk queries filter on.
    pub budget_id: String,
    /// Generation stamp.
    pub last_modified: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #[test]
        fn chunk_id_parses_what_it_builds(
            field in proptest::sample::select(TrackedField::ALL.to_vec()),
            index in 0u32..2_000_000,
        ) {
            let id = ChunkId::new(field, index);
            prop_assert_eq!(id.parse(), Some((field, index)));
        }

        #[test]
        fn chunk_ids_sort_by_index_within_field(a in 0u32..99_999, b in 0u32..99_999) {
            let ia = ChunkId::new(TrackedField::Bills, a);
            let ib = ChunkId::new(TrackedField::Bills, b);
            prop_assert_eq!(ia.cmp(&ib), a.cmp(&b));
        }
    }

    #[test]
    fn chunk_id_format() {
        let id = ChunkId::new(TrackedField::Transactions, 3);
        assert_eq!(id.as_str(), "transactions-00003");
        assert_eq!(id.parse(), Some((TrackedField::Transactions, 3)));

        let big = ChunkId::new(TrackedField::SavingsGoals, 123_456);
        assert_eq!(big.as_str(), "savingsGoals-123456");
        assert_eq!(big.parse(), Some((TrackedField::SavingsGoals, 123_456)));
    }

    #[test]
    fn chunk_id_parse_rejects_foreign_ids() {
        assert_eq!(ChunkId::from_raw("notes-00001").parse(), None);
        assert_eq!(ChunkId::from_raw("bills-1").parse(), None);
        assert_eq!(ChunkId::from_raw("bills").parse(), None);
        assert_eq!(ChunkId::from_raw("bills-0000x").parse(), None);
    }

    #[test]
    fn chunk_document_field_names() {
        let doc = ChunkDocument {
            chunk_type: "bills".into(),
            chunk_index: 0,
            total_chunks: 1,
            encrypted_data: EncryptedPayload::from_bytes(&[1; 20], &[2; 12]),
            budget_id: "b1".into(),
            last_modified: 42,
        };
        let value = serde_json::to_value(&doc).unwrap();
        for key in [
            "chunkType",
            "chunkIndex",
            "totalChunks",
            "encryptedData",
            "budgetId",
            "lastModified",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["encryptedData"]["data"].is_string());
    }

    #[test]
    fn chunk_document_accepts_legacy_payload() {
        let value = json!({
            "chunkType": "bills",
            "chunkIndex": 0,
            "totalChunks": 1,
            "encryptedData": {"data": [1, 2, 3], "iv": [4, 5, 6]},
            "budgetId": "b1",
            "lastModified": 1
        });
        let doc: ChunkDocument = serde_json::from_value(value).unwrap();
        assert!(doc.encrypted_data.data.is_legacy());
    }
}
