//! # BudgetSync Crypto
//!
//! Encryption primitives for BudgetSync.
//!
//! ## Security Model
//!
//! - [`Cipher`] is the seam the sync engine encrypts through
//! - [`AesGcmCipher`] uses AES-256-GCM with a unique random IV per message
//! - [`EncryptionKey`] is zeroized on drop and redacted in `Debug`
//! - Key check values let a reader tell "written under another key" apart
//!   from "damaged ciphertext" before deciding on destructive recovery
//!
//! ## Usage
//!
//! ```rust
//! use budgetsync_crypto::{AesGcmCipher, Cipher, EncryptionKey};
//!
//! let key = EncryptionKey::generate();
//! let cipher = AesGcmCipher::new();
//!
//! let blob = cipher.encrypt(b"secret budget", &key).unwrap();
//! let plain = cipher.decrypt(&blob.data, &key, &blob.iv).unwrap();
//! assert_eq!(plain, b"secret budget");
//! assert!(key.matches_key_check(&key.key_check()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cipher;
mod error;
mod key;

pub use cipher::{AesGcmCipher, Cipher, EncryptedBlob, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{EncryptionKey, KEY_CHECK_SIZE, KEY_SIZE};
