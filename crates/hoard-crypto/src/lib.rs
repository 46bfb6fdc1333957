//! Cryptographic primitives for CASC and MPQ game archives
//!
//! This crate provides the ciphers and hashes both archive families depend on.
//!
//! # Components
//!
//! - **MPQ cipher**: the shared 1280-entry crypt table, the case-insensitive
//!   string hash used for hash-table lookups, and the word-oriented stream
//!   cipher protecting the hash and block tables
//! - **CASC ciphers**: Salsa20 (16-byte key variant) and ARC4 for encrypted
//!   BLTE chunks
//! - **Keys**: TACT key types, an in-memory key store and the
//!   [`TactKeyProvider`] lookup seam consumed by the BLTE reader
//!
//! # Examples
//!
//! ## Hashing an MPQ file name
//!
//! ```
//! use hoard_crypto::storm::{HashType, hash_string};
//!
//! let a = hash_string("(listfile)", HashType::HashA);
//! assert_eq!(a, hash_string("(LISTFILE)", HashType::HashA));
//! ```
//!
//! ## Content keys
//!
//! ```
//! use hoard_crypto::md5::ContentKey;
//!
//! let content_key = ContentKey::from_data(b"Hello, World!");
//! println!("Content key: {content_key}");
//! ```

#![warn(missing_docs)]

pub mod arc4;
pub mod error;
pub mod keys;
pub mod md5;
pub mod salsa20;
pub mod storm;

pub use error::CryptoError;

pub use arc4::Arc4Cipher;
pub use keys::{TactKey, TactKeyProvider, TactKeyStore};
pub use md5::{ContentKey, EncodingKey, FileDataId};
pub use salsa20::Salsa20Cipher;
pub use storm::HashType;
