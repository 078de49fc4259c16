//! Building, encoding and resolving the manifest.
//!
//! The manifest is the only authoritative index of a root. Decoding
//! classifies every failure so recovery can tell a damaged manifest
//! (safe to reset) from one written under another key (never reset).

use crate::context::EngineContext;
use crate::error::SyncResult;
use crate::payload::OpenFault;
use budgetsync_codec::from_json_slice;
use budgetsync_protocol::{ChunkMap, Manifest, ManifestDocument, ManifestMetadata, MANIFEST_TYPE};
use std::mem;
use thiserror::Error;

/// Why a manifest document could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestFault {
    /// Payload missing, empty, or shorter than plausible.
    #[error("manifest payload is truncated")]
    Truncated,
    /// Document, encoding or decrypted content is not well formed.
    #[error("manifest is malformed: {0}")]
    Malformed(String),
    /// Decryption failed although the key check matches.
    #[error("manifest ciphertext is corrupted")]
    Corrupted,
    /// The key check belongs to another key.
    #[error("manifest was written with a different key")]
    WrongKey,
    /// Decryption failed and there is no key check to tell why.
    #[error("manifest cannot be decrypted and carries no key check")]
    Ambiguous,
}

impl ManifestFault {
    /// Returns true if the fault proves the remote data is damaged, so a
    /// reset cannot destroy readable data.
    pub fn is_confirmed_corruption(&self) -> bool {
        matches!(
            self,
            ManifestFault::Truncated | ManifestFault::Malformed(_) | ManifestFault::Corrupted
        )
    }

    /// Returns true for faults of the truncation class.
    pub fn is_truncation(&self) -> bool {
        matches!(self, ManifestFault::Truncated)
    }

    /// Returns true if both faults are the same kind, ignoring details.
    pub fn same_kind(&self, other: &ManifestFault) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// Assembles a manifest for one generation.
pub fn build_manifest(
    chunk_map: ChunkMap,
    mut metadata: ManifestMetadata,
    budget_id: &str,
    generation: u64,
) -> Manifest {
    metadata.total_documents = chunk_map.values().map(Vec::len).sum();
    Manifest {
        doc_type: MANIFEST_TYPE.to_owned(),
        budget_id: budget_id.to_owned(),
        last_modified: generation,
        chunk_map,
        metadata,
    }
}

/// Encrypts a manifest into its stored form, stamped with the key check.
pub(crate) fn encode_manifest(
    ctx: &EngineContext,
    manifest: &Manifest,
) -> SyncResult<ManifestDocument> {
    Ok(ManifestDocument {
        doc_type: MANIFEST_TYPE.to_owned(),
        encrypted_data: Some(ctx.payload.seal(manifest)?),
        last_modified: manifest.last_modified,
        chunk_count: manifest.total_chunks(),
        key_check: Some(ctx.payload.key_check().to_owned()),
    })
}

/// Decrypts and validates a stored manifest.
pub(crate) fn decode_manifest(
    ctx: &EngineContext,
    doc: &ManifestDocument,
) -> Result<Manifest, ManifestFault> {
    if doc.doc_type != MANIFEST_TYPE {
        return Err(ManifestFault::Malformed(format!(
            "unexpected document type {:?}",
            doc.doc_type
        )));
    }

    // A foreign key check settles the question before anything else.
    if let Some(check) = &doc.key_check {
        if !ctx.payload.matches_key_check(check) {
            return Err(ManifestFault::WrongKey);
        }
    }

    let payload = doc.encrypted_data.as_ref().ok_or(ManifestFault::Truncated)?;
    let plaintext = ctx.payload.open(payload).map_err(|fault| match fault {
        OpenFault::Truncated { .. } => ManifestFault::Truncated,
        OpenFault::Encoding(msg) => ManifestFault::Malformed(msg),
        OpenFault::Undecryptable(_) if doc.key_check.is_some() => ManifestFault::Corrupted,
        OpenFault::Undecryptable(_) => ManifestFault::Ambiguous,
    })?;

    let manifest: Manifest =
        from_json_slice(&plaintext).map_err(|e| ManifestFault::Malformed(e.to_string()))?;
    if manifest.doc_type != MANIFEST_TYPE {
        return Err(ManifestFault::Malformed(format!(
            "decrypted type {:?}",
            manifest.doc_type
        )));
    }
    if manifest.budget_id != ctx.budget_id {
        return Err(ManifestFault::Malformed(format!(
            "manifest belongs to budget {:?}",
            manifest.budget_id
        )));
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use budgetsync_codec::EncodedBytes;
    use budgetsync_crypto::{AesGcmCipher, EncryptionKey};
    use budgetsync_protocol::{ChunkId, EncryptedPayload, TrackedField};
    use budgetsync_store::InMemoryDocumentStore;
    use std::sync::Arc;

    fn context(budget_id: &str, key: EncryptionKey) -> EngineContext {
        EngineContext::new(
            budget_id.into(),
            key,
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(AesGcmCipher::new()),
            SyncConfig::default(),
        )
        .unwrap()
    }

    fn manifest(budget_id: &str) -> Manifest {
        let mut map = ChunkMap::new();
        for field in TrackedField::ALL {
            map.insert(field.as_str().into(), Vec::new());
        }
        map.insert(
            "bills".into(),
            vec![ChunkId::new(TrackedField::Bills, 0)],
        );
        build_manifest(map, ManifestMetadata::default(), budget_id, 1234)
    }

    #[test]
    fn build_counts_documents() {
        let m = manifest("b");
        assert_eq!(m.metadata.total_documents, 1);
        assert_eq!(m.last_modified, 1234);
        assert_eq!(m.doc_type, MANIFEST_TYPE);
    }

    #[test]
    fn encode_then_decode() {
        let ctx = context("b", EncryptionKey::generate());
        let doc = encode_manifest(&ctx, &manifest("b")).unwrap();
        assert_eq!(doc.chunk_count, 1);
        assert_eq!(doc.last_modified, 1234);
        assert!(doc.key_check.is_some());
        assert_eq!(decode_manifest(&ctx, &doc).unwrap(), manifest("b"));
    }

    #[test]
    fn other_key_is_wrong_key() {
        let writer = context("b", EncryptionKey::generate());
        let reader = context("b", EncryptionKey::generate());
        let doc = encode_manifest(&writer, &manifest("b")).unwrap();
        assert_eq!(decode_manifest(&reader, &doc), Err(ManifestFault::WrongKey));
    }

    #[test]
    fn legacy_manifest_with_other_key_is_ambiguous() {
        let writer = context("b", EncryptionKey::generate());
        let reader = context("b", EncryptionKey::generate());
        let mut doc = encode_manifest(&writer, &manifest("b")).unwrap();
        doc.key_check = None;
        assert_eq!(decode_manifest(&reader, &doc), Err(ManifestFault::Ambiguous));
    }

    #[test]
    fn flipped_ciphertext_with_matching_check_is_corrupted() {
        let ctx = context("b", EncryptionKey::generate());
        let mut doc = encode_manifest(&ctx, &manifest("b")).unwrap();
        let payload = doc.encrypted_data.as_mut().unwrap();
        let mut bytes = payload.data.to_bytes().unwrap();
        bytes[0] ^= 0xFF;
        payload.data = EncodedBytes::from_bytes(&bytes);
        assert_eq!(decode_manifest(&ctx, &doc), Err(ManifestFault::Corrupted));
    }

    #[test]
    fn short_or_missing_payload_is_truncated() {
        let ctx = context("b", EncryptionKey::generate());
        let mut doc = encode_manifest(&ctx, &manifest("b")).unwrap();
        doc.encrypted_data = Some(EncryptedPayload::from_bytes(&[1; 10], &[2; 12]));
        assert_eq!(decode_manifest(&ctx, &doc), Err(ManifestFault::Truncated));

        doc.encrypted_data = None;
        assert_eq!(decode_manifest(&ctx, &doc), Err(ManifestFault::Truncated));
    }

    #[test]
    fn foreign_budget_is_malformed() {
        let key = EncryptionKey::generate();
        let writer = context("a", key.clone());
        let reader = context("b", key);
        let doc = encode_manifest(&writer, &manifest("a")).unwrap();
        assert!(matches!(
            decode_manifest(&reader, &doc),
            Err(ManifestFault::Malformed(_))
        ));
    }

    #[test]
    fn fault_classes() {
        assert!(ManifestFault::Truncated.is_confirmed_corruption());
        assert!(ManifestFault::Corrupted.is_confirmed_corruption());
        assert!(!ManifestFault::WrongKey.is_confirmed_corruption());
        assert!(!ManifestFault::Ambiguous.is_confirmed_corruption());
        assert!(ManifestFault::Malformed("a".into()).same_kind(&ManifestFault::Malformed("b".into())));
        assert!(!ManifestFault::Truncated.same_kind(&ManifestFault::Corrupted));
    }
}
