//! Planting damaged documents.
//!
//! Every helper writes through [`InMemoryDocumentStore::insert_raw`], so
//! documents land exactly as given, bypassing validation.

use budgetsync_codec::bytes_to_base64;
use budgetsync_store::{DocumentPath, DocumentStore, InMemoryDocumentStore};
use serde_json::{json, Value};

/// Manifest type marker as written by the engine.
const MANIFEST_TYPE: &str = budgetsync_protocol::MANIFEST_TYPE;

/// Kinds of damage a stored document can suffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Damage {
    /// Ciphertext and IV emptied, as left by an interrupted upload.
    Truncate,
    /// Ciphertext replaced by plausible-length garbage; IV and key check kept.
    Mangle,
    /// The encrypted payload removed entirely.
    StripPayload,
    /// The document replaced by an object of the wrong shape.
    Garbage,
}

impl Damage {
    /// Every damage kind.
    pub const ALL: [Damage; 4] = [
        Damage::Truncate,
        Damage::Mangle,
        Damage::StripPayload,
        Damage::Garbage,
    ];

    /// Applies the damage to the document at `path`.
    ///
    /// # Panics
    ///
    /// Panics if no document exists at `path`.
    pub fn apply(self, store: &InMemoryDocumentStore, path: &DocumentPath) {
        let mut doc = store
            .get(path)
            .expect("Failed to read document")
            .expect("No document to damage");
        match self {
            Damage::Truncate => {
                doc["encryptedData"] = json!({"data": "", "iv": ""});
            }
            Damage::Mangle => {
                doc["encryptedData"]["data"] = Value::String(bytes_to_base64(&[0x5a; 48]));
            }
            Damage::StripPayload => {
                if let Some(object) = doc.as_object_mut() {
                    object.remove("encryptedData");
                }
            }
            Damage::Garbage => {
                doc = json!({"unexpected": true, "chunkIndex": "seven"});
            }
        }
        store.insert_raw(path.clone(), doc);
    }
}

/// A manifest whose payload was cut off before any byte arrived.
pub fn truncated_manifest(last_modified: u64) -> Value {
    json!({
        "type": MANIFEST_TYPE,
        "encryptedData": {"data": "", "iv": ""},
        "lastModified": last_modified,
        "chunkCount": 1,
    })
}

/// A manifest without a key check whose ciphertext no key can open.
pub fn unverifiable_manifest(last_modified: u64) -> Value {
    json!({
        "type": MANIFEST_TYPE,
        "encryptedData": {
            "data": bytes_to_base64(&[0xa5; 64]),
            "iv": bytes_to_base64(&[0x01; 12]),
        },
        "lastModified": last_modified,
        "chunkCount": 0,
    })
}

/// An unreferenced chunk document stamped with `budget_id`.
pub fn stray_chunk(budget_id: &str, chunk_type: &str, index: u32) -> Value {
    json!({
        "chunkType": chunk_type,
        "chunkIndex": index,
        "totalChunks": index + 1,
        "encryptedData": {
            "data": bytes_to_base64(&[0x33; 32]),
            "iv": bytes_to_base64(&[0x44; 12]),
        },
        "budgetId": budget_id,
        "lastModified": 1,
    })
}
