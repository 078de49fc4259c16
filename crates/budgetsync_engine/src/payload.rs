//! Sealing and opening encrypted document payloads.

use crate::error::SyncResult;
use budgetsync_codec::{to_json_vec, EncodedBytes};
use budgetsync_crypto::{Cipher, EncryptionKey};
use budgetsync_protocol::EncryptedPayload;
use serde::Serialize;
use std::sync::Arc;

/// Why an encrypted payload could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OpenFault {
    /// Ciphertext or IV is empty or shorter than plausible.
    Truncated {
        ciphertext_len: usize,
        iv_len: usize,
    },
    /// The stored encoding could not be decoded.
    Encoding(String),
    /// Decryption or authentication failed.
    Undecryptable(String),
}

/// Encrypts values into payloads and back under one key.
pub(crate) struct PayloadCipher {
    cipher: Arc<dyn Cipher>,
    key: EncryptionKey,
    key_check: String,
    min_ciphertext_len: usize,
    min_iv_len: usize,
}

impl PayloadCipher {
    pub(crate) fn new(
        cipher: Arc<dyn Cipher>,
        key: EncryptionKey,
        min_ciphertext_len: usize,
        min_iv_len: usize,
    ) -> Self {
        let key_check = key.key_check();
        Self {
            cipher,
            key,
            key_check,
            min_ciphertext_len,
            min_iv_len,
        }
    }

    /// Serializes `value` to JSON and encrypts it.
    pub(crate) fn seal<T: Serialize + ?Sized>(&self, value: &T) -> SyncResult<EncryptedPayload> {
        let plaintext = to_json_vec(value)?;
        let blob = self.cipher.encrypt(&plaintext, &self.key)?;
        Ok(EncryptedPayload::from_bytes(&blob.data, &blob.iv))
    }

    /// Decodes and decrypts a payload, checking plausible lengths first.
    pub(crate) fn open(&self, payload: &EncryptedPayload) -> Result<Vec<u8>, OpenFault> {
        if payload.data.stored_len() == 0 || payload.iv.stored_len() == 0 {
            return Err(OpenFault::Truncated {
                ciphertext_len: payload.data.stored_len(),
                iv_len: payload.iv.stored_len(),
            });
        }

        let data = decode(&payload.data)?;
        let iv = decode(&payload.iv)?;
        if data.len() < self.min_ciphertext_len || iv.len() < self.min_iv_len {
            return Err(OpenFault::Truncated {
                ciphertext_len: data.len(),
                iv_len: iv.len(),
            });
        }

        self.cipher
            .decrypt(&data, &self.key, &iv)
            .map_err(|e| OpenFault::Undecryptable(e.to_string()))
    }

    /// Base64 check value of the key in use.
    pub(crate) fn key_check(&self) -> &str {
        &self.key_check
    }

    pub(crate) fn matches_key_check(&self, check: &str) -> bool {
        self.key.matches_key_check(check)
    }
}

fn decode(bytes: &EncodedBytes) -> Result<Vec<u8>, OpenFault> {
    bytes
        .to_bytes()
        .map_err(|e| OpenFault::Encoding(e.to_string()))
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("key", &self.key)
            .field("min_ciphertext_len", &self.min_ciphertext_len)
            .field("min_iv_len", &self.min_iv_len)
            .finish()
    }
}
