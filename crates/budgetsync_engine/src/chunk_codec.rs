//! Encoding items into encrypted chunk documents and back.

use crate::context::EngineContext;
use crate::error::SyncResult;
use crate::payload::OpenFault;
use budgetsync_codec::from_json_slice;
use budgetsync_protocol::{ChunkDocument, ChunkEnvelope, Record, TrackedField};
use budgetsync_store::Document;
use thiserror::Error;

/// Why a listed chunk could not contribute to a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkFault {
    /// No document exists at the chunk's path.
    #[error("chunk document is missing")]
    Missing,
    /// Ciphertext or IV is shorter than plausible.
    #[error("payload truncated (ciphertext {ciphertext_len} bytes, iv {iv_len} bytes)")]
    Truncated {
        /// Decoded ciphertext length.
        ciphertext_len: usize,
        /// Decoded IV length.
        iv_len: usize,
    },
    /// Decryption or authentication failed.
    #[error("payload could not be decrypted: {0}")]
    Undecryptable(String),
    /// The document or decrypted envelope is not well formed.
    #[error("malformed chunk: {0}")]
    Malformed(String),
    /// The envelope belongs to another field, index or budget.
    #[error("chunk does not match its listing: {0}")]
    Mismatched(String),
}

impl From<OpenFault> for ChunkFault {
    fn from(fault: OpenFault) -> Self {
        match fault {
            OpenFault::Truncated {
                ciphertext_len,
                iv_len,
            } => ChunkFault::Truncated {
                ciphertext_len,
                iv_len,
            },
            OpenFault::Encoding(msg) => ChunkFault::Malformed(msg),
            OpenFault::Undecryptable(msg) => ChunkFault::Undecryptable(msg),
        }
    }
}

/// A successfully decoded chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    /// Position within the field.
    pub index: u32,
    /// Chunk count recorded by the writer.
    pub total_chunks: u32,
    /// Generation stamp of the chunk.
    pub last_modified: u64,
    /// The items.
    pub items: Vec<Record>,
}

/// Encrypts a slice of items into a chunk document.
pub(crate) fn encode_chunk(
    ctx: &EngineContext,
    items: &[Record],
    field: TrackedField,
    index: u32,
    total: u32,
    generation: u64,
) -> SyncResult<ChunkDocument> {
    let envelope = ChunkEnvelope {
        chunk_type: field.as_str().to_owned(),
        chunk_index: index,
        total_chunks: total,
        data: items.to_vec(),
        budget_id: ctx.budget_id.clone(),
        last_modified: generation,
    };
    let encrypted_data = ctx.payload.seal(&envelope)?;

    Ok(ChunkDocument {
        chunk_type: envelope.chunk_type,
        chunk_index: index,
        total_chunks: total,
        encrypted_data,
        budget_id: envelope.budget_id,
        last_modified: generation,
    })
}

/// Decrypts and validates a stored chunk document.
pub(crate) fn decode_chunk(
    ctx: &EngineContext,
    document: Document,
    expected_field: TrackedField,
) -> Result<DecodedChunk, ChunkFault> {
    let doc: ChunkDocument = serde_json::from_value(document)
        .map_err(|e| ChunkFault::Malformed(format!("document: {e}")))?;

    let plaintext = ctx.payload.open(&doc.encrypted_data)?;
    let envelope: ChunkEnvelope = from_json_slice(&plaintext)
        .map_err(|e| ChunkFault::Malformed(format!("envelope: {e}")))?;

    if envelope.chunk_type != expected_field.as_str() || doc.chunk_type != envelope.chunk_type {
        return Err(ChunkFault::Mismatched(format!(
            "expected field {expected_field}, document says {}, envelope says {}",
            doc.chunk_type, envelope.chunk_type
        )));
    }
    if envelope.chunk_index != doc.chunk_index {
        return Err(ChunkFault::Mismatched(format!(
            "document index {} but envelope index {}",
            doc.chunk_index, envelope.chunk_index
        )));
    }
    if envelope.budget_id != ctx.budget_id {
        return Err(ChunkFault::Mismatched(format!(
            "envelope belongs to budget {:?}",
            envelope.budget_id
        )));
    }

    Ok(DecodedChunk {
        index: envelope.chunk_index,
        total_chunks: envelope.total_chunks,
        last_modified: envelope.last_modified,
        items: envelope.data,
    })
}
