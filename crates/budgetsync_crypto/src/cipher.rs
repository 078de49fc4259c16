//! Authenticated encryption behind the [`Cipher`] trait.

use crate::error::{CryptoError, CryptoResult};
use crate::key::EncryptionKey;
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

/// Size of the GCM nonce (IV) in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext together with the IV it was produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// Ciphertext, including any authentication tag.
    pub data: Vec<u8>,
    /// Initialization vector.
    pub iv: Vec<u8>,
}

/// Symmetric encryption primitive consumed by the sync engine.
///
/// Implementations must be `Send + Sync`. Every call to `encrypt` must use
/// a fresh IV.
pub trait Cipher: Send + Sync {
    /// Encrypts `plaintext` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    fn encrypt(&self, plaintext: &[u8], key: &EncryptionKey) -> CryptoResult<EncryptedBlob>;

    /// Decrypts `data` produced under `key` and `iv`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is wrong or the ciphertext is damaged.
    fn decrypt(&self, data: &[u8], key: &EncryptionKey, iv: &[u8]) -> CryptoResult<Vec<u8>>;
}

impl<C: Cipher + ?Sized> Cipher for std::sync::Arc<C> {
    fn encrypt(&self, plaintext: &[u8], key: &EncryptionKey) -> CryptoResult<EncryptedBlob> {
        (**self).encrypt(plaintext, key)
    }

    fn decrypt(&self, data: &[u8], key: &EncryptionKey, iv: &[u8]) -> CryptoResult<Vec<u8>> {
        (**self).decrypt(data, key, iv)
    }
}

/// AES-256-GCM with a random 96-bit IV per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    /// Creates the cipher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn engine(key: &EncryptionKey) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()))
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8], key: &EncryptionKey) -> CryptoResult<EncryptedBlob> {
        let mut iv = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let data = Self::engine(key)
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| CryptoError::encryption_failed("encryption error"))?;

        Ok(EncryptedBlob {
            data,
            iv: iv.to_vec(),
        })
    }

    fn decrypt(&self, data: &[u8], key: &EncryptionKey, iv: &[u8]) -> CryptoResult<Vec<u8>> {
        if iv.len() != NONCE_SIZE {
            return Err(CryptoError::invalid_iv_size(iv.len(), NONCE_SIZE));
        }
        if data.len() < TAG_SIZE {
            return Err(CryptoError::decryption_failed("ciphertext too short"));
        }

        Self::engine(key)
            .decrypt(Nonce::from_slice(iv), data)
            .map_err(|_| CryptoError::decryption_failed("decryption error"))
    }
}
