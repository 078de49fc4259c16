//! Encryption keys and key check values.

use crate::error::{CryptoError, CryptoResult};
use budgetsync_codec::bytes_to_base64;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of a key check value before base64 encoding.
pub const KEY_CHECK_SIZE: usize = 16;

const KEY_CHECK_CONTEXT: &[u8] = b"budgetsync-key-check-v1";
const DERIVATION_INFO: &[u8] = b"budgetsync-encryption-key-v1";

/// Symmetric key used for chunk and manifest encryption.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::invalid_key_size(bytes.len(), KEY_SIZE));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the raw key bytes.
    ///
    /// # Security
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Derives a key from a passphrase using HKDF-SHA256.
    ///
    /// HKDF does not stretch low-entropy input. Use it with high-entropy
    /// passphrases or keys already produced by a password hash.
    ///
    /// # Errors
    ///
    /// Returns an error if HKDF expansion fails.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> CryptoResult<Self> {
        use hkdf::Hkdf;

        let hk = Hkdf::<Sha256>::new(Some(salt), password);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(DERIVATION_INFO, &mut bytes)
            .map_err(|_| CryptoError::key_derivation_failed("HKDF expand failed"))?;
        Ok(Self { bytes })
    }

    /// Returns this key's check value, base64 encoded.
    ///
    /// The value identifies which key wrote a document without revealing
    /// the key. Two different keys produce different check values with
    /// overwhelming probability.
    #[must_use]
    pub fn key_check(&self) -> String {
        bytes_to_base64(&self.key_check_bytes())
    }

    /// Returns true if `check` is this key's check value.
    ///
    /// The comparison runs in constant time.
    #[must_use]
    pub fn matches_key_check(&self, check: &str) -> bool {
        let Ok(expected) = budgetsync_codec::base64_to_bytes(check) else {
            return false;
        };
        if expected.len() != KEY_CHECK_SIZE {
            return false;
        }
        let mut mac = self.check_mac();
        mac.update(KEY_CHECK_CONTEXT);
        mac.verify_truncated_left(&expected).is_ok()
    }

    fn key_check_bytes(&self) -> [u8; KEY_CHECK_SIZE] {
        let mut mac = self.check_mac();
        mac.update(KEY_CHECK_CONTEXT);
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; KEY_CHECK_SIZE];
        out.copy_from_slice(&full[..KEY_CHECK_SIZE]);
        out
    }

    fn check_mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.bytes)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_key() {
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn key_wrong_size() {
        assert!(matches!(
            EncryptionKey::from_bytes(&[0u8; 16]),
            Err(CryptoError::InvalidKeySize {
                actual: 16,
                expected: 32
            })
        ));
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn derive_key_from_password() {
        let key1 = EncryptionKey::derive_from_password(b"pass", b"salt").unwrap();
        let key2 = EncryptionKey::derive_from_password(b"pass", b"salt").unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());

        let key3 = EncryptionKey::derive_from_password(b"pass", b"other").unwrap();
        assert_ne!(key1.as_bytes(), key3.as_bytes());
    }

    #[test]
    fn key_check_is_stable_and_key_specific() {
        let key = EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).unwrap();
        let other = EncryptionKey::from_bytes(&[8u8; KEY_SIZE]).unwrap();

        assert_eq!(key.key_check(), key.clone().key_check());
        assert_ne!(key.key_check(), other.key_check());
        assert!(key.matches_key_check(&key.key_check()));
        assert!(!key.matches_key_check(&other.key_check()));
    }

    #[test]
    fn key_check_rejects_garbage() {
        let key = EncryptionKey::generate();
        assert!(!key.matches_key_check(""));
        assert!(!key.matches_key_check("not base64!"));
        // A shorter prefix of the real value is not accepted.
        let short = bytes_to_base64(&key.key_check_bytes()[..8]);
        assert!(!key.matches_key_check(&short));
    }

    #[test]
    fn debug_redacts_key() {
        let key = EncryptionKey::from_bytes(&[0xAB; KEY_SIZE]).unwrap();
        let text = format!("{key:?}");
        assert!(text.contains("REDACTED"));
        assert!(!text.contains("171"));
    }
}
