//! # BudgetSync Codec
//!
//! Transport encodings and size estimation for BudgetSync.
//!
//! This crate provides:
//! - Base64 conversion for encrypted payloads
//! - [`EncodedBytes`], which reads both base64 and legacy numeric-array payloads
//! - Serialized-size estimation used to decide chunk boundaries
//!
//! ## Usage
//!
//! ```
//! use budgetsync_codec::{base64_to_bytes, bytes_to_base64, estimate_size};
//!
//! let encoded = bytes_to_base64(&[0xde, 0xad, 0xbe, 0xef]);
//! assert_eq!(base64_to_bytes(&encoded).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
//!
//! assert_eq!(estimate_size(&vec![1, 2, 3]).unwrap(), "[1,2,3]".len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod base64;
mod bytes;
mod error;
mod size;

pub use base64::{base64_to_bytes, bytes_to_base64};
pub use bytes::EncodedBytes;
pub use error::{CodecError, CodecResult};
pub use size::{estimate_size, from_json_slice, to_json_vec};
