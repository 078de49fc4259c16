//! CLI command implementations.

pub mod gc;
pub mod inspect;
pub mod reset;
pub mod verify;

use budgetsync_codec::base64_to_bytes;
use budgetsync_crypto::{AesGcmCipher, CryptoError, EncryptionKey};
use budgetsync_engine::{ChunkedSyncEngine, RecoveryPolicy, StaticAuthenticator, SyncConfig};
use budgetsync_store::{FileDocumentStore, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while preparing a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The key argument is not valid base64.
    #[error("key is not valid base64: {0}")]
    KeyEncoding(String),
    /// The key could not be built.
    #[error("invalid key: {0}")]
    Key(#[from] CryptoError),
    /// The store directory could not be opened.
    #[error("cannot open store: {0}")]
    Store(#[from] StoreError),
}

/// The budget a command operates on.
#[derive(Debug, Clone)]
pub struct Target {
    /// Store directory.
    pub path: PathBuf,
    /// Budget id.
    pub budget_id: String,
    /// Root collection name.
    pub root_collection: String,
}

/// Where the encryption key comes from.
#[derive(Clone)]
pub enum KeySource {
    /// Raw key bytes in base64.
    Base64(String),
    /// HKDF derivation from a passphrase and salt.
    Passphrase {
        /// The passphrase.
        passphrase: String,
        /// The salt.
        salt: String,
    },
}

impl KeySource {
    /// Builds the key.
    pub fn resolve(&self) -> Result<EncryptionKey, CommandError> {
        match self {
            KeySource::Base64(encoded) => {
                let bytes = base64_to_bytes(encoded.trim())
                    .map_err(|e| CommandError::KeyEncoding(e.to_string()))?;
                Ok(EncryptionKey::from_bytes(&bytes)?)
            }
            KeySource::Passphrase { passphrase, salt } => Ok(
                EncryptionKey::derive_from_password(passphrase.as_bytes(), salt.as_bytes())?,
            ),
        }
    }
}

/// Opens the file store at the target path.
pub fn open_store(target: &Target) -> Result<Arc<FileDocumentStore>, CommandError> {
    Ok(Arc::new(FileDocumentStore::open(&target.path)?))
}

/// Opens an engine that never resets on its own.
pub fn open_engine(
    target: &Target,
    store: Arc<FileDocumentStore>,
    key: &KeySource,
) -> Result<ChunkedSyncEngine, Box<dyn std::error::Error>> {
    let config = SyncConfig::default()
        .with_root_collection(target.root_collection.clone())
        .with_recovery(RecoveryPolicy::manual());
    Ok(ChunkedSyncEngine::initialize(
        target.budget_id.clone(),
        key.resolve()?,
        store,
        Arc::new(AesGcmCipher::new()),
        Arc::new(StaticAuthenticator::authenticated()),
        config,
    )?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use budgetsync_protocol::{AuthorMeta, BudgetData, TrackedField};
    use serde_json::json;

    pub(crate) const KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

    pub(crate) fn target(dir: &std::path::Path) -> Target {
        Target {
            path: dir.to_path_buf(),
            budget_id: "cli-budget".into(),
            root_collection: "budgets".into(),
        }
    }

    pub(crate) fn key() -> KeySource {
        KeySource::Base64(KEY.into())
    }

    /// Writes a small budget and releases the store lock.
    pub(crate) fn seed(target: &Target) {
        let engine = open_engine(target, open_store(target).unwrap(), &key()).unwrap();
        let data = BudgetData::new()
            .with_field(
                TrackedField::Transactions,
                (0..25).map(|i| json!({"id": i, "amount": i * 3})).collect(),
            )
            .with_field(TrackedField::Bills, vec![json!({"id": "rent"})]);
        engine
            .save_to_cloud(&data, &AuthorMeta::anonymous())
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_key_resolves() {
        let key = test_support::key().resolve().unwrap();
        assert_eq!(key.as_bytes()[31], 31);
    }

    #[test]
    fn short_key_is_rejected() {
        let err = KeySource::Base64("AAEC".into()).resolve().err().unwrap();
        assert!(matches!(err, CommandError::Key(_)));
    }

    #[test]
    fn bad_encoding_is_rejected() {
        let err = KeySource::Base64("%%%".into()).resolve().err().unwrap();
        assert!(matches!(err, CommandError::KeyEncoding(_)));
    }

    #[test]
    fn passphrase_is_deterministic() {
        let source = KeySource::Passphrase {
            passphrase: "correct horse".into(),
            salt: "budget".into(),
        };
        assert_eq!(
            source.resolve().unwrap().key_check(),
            source.resolve().unwrap().key_check()
        );
    }
}
