//! TACT decryption keys
//!
//! A key is addressed by its 64-bit key name, written as 16 hex characters in
//! key lists and stored little-endian inside encrypted BLTE chunks. The key
//! itself is 16 bytes, written as 32 hex characters.

use std::collections::HashMap;
use std::fmt;

use crate::error::CryptoError;

/// Length of a key name in hex characters
pub const KEY_NAME_HEX_LEN: usize = 16;

/// Length of a key in hex characters
pub const KEY_HEX_LEN: usize = 32;

/// Lookup seam for decryption keys
///
/// The BLTE reader only ever asks for a key by name; where the keys come from
/// is up to the implementor.
pub trait TactKeyProvider: Send + Sync {
    /// Key for `key_name`, if known
    fn get_key(&self, key_name: u64) -> Option<[u8; 16]>;
}

/// Check that a key name / key pair has the expected hex lengths
pub fn is_valid_key_pair(key_name: &str, key: &str) -> bool {
    key_name.len() == KEY_NAME_HEX_LEN && key.len() == KEY_HEX_LEN
}

/// Parse a 16-character hex key name
pub fn parse_key_name(key_name: &str) -> Result<u64, CryptoError> {
    let key_name = key_name.trim();
    if key_name.len() != KEY_NAME_HEX_LEN {
        return Err(CryptoError::InvalidKeyFormat(format!(
            "key name must be {KEY_NAME_HEX_LEN} hex characters, got {}",
            key_name.len()
        )));
    }

    u64::from_str_radix(key_name, 16)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid key name {key_name}: {e}")))
}

/// Format a key name the way key lists write it
pub fn format_key_name(key_name: u64) -> String {
    format!("{key_name:016x}")
}

/// A TACT encryption key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TactKey {
    /// Key name
    pub id: u64,
    /// 16-byte key
    pub key: [u8; 16],
}

impl TactKey {
    /// Create a new key
    pub fn new(id: u64, key: [u8; 16]) -> Self {
        Self { id, key }
    }

    /// Parse a key from its hex key name and hex key
    pub fn from_hex_pair(key_name: &str, key: &str) -> Result<Self, CryptoError> {
        let id = parse_key_name(key_name)?;
        let key = key.trim();
        if key.len() != KEY_HEX_LEN {
            return Err(CryptoError::InvalidKeySize {
                expected: 16,
                actual: key.len() / 2,
            });
        }

        let mut bytes = [0u8; 16];
        hex::decode_to_slice(key, &mut bytes)?;
        Ok(Self::new(id, bytes))
    }

    /// Hex key name, lower-case
    pub fn name_hex(&self) -> String {
        format_key_name(self.id)
    }

    /// Hex key, lower-case
    pub fn key_hex(&self) -> String {
        hex::encode(self.key)
    }
}

impl fmt::Display for TactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.name_hex(), self.key_hex())
    }
}

/// In-memory key store
#[derive(Debug, Clone, Default)]
pub struct TactKeyStore {
    keys: HashMap<u64, [u8; 16]>,
}

impl TactKeyStore {
    /// Create an empty key store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a key by name
    pub fn get(&self, id: u64) -> Option<&[u8; 16]> {
        self.keys.get(&id)
    }

    /// Insert a key, returning `true` when the store changed
    pub fn add(&mut self, key: TactKey) -> bool {
        self.keys.insert(key.id, key.key) != Some(key.key)
    }

    /// Remove a key
    pub fn remove(&mut self, id: u64) -> Option<[u8; 16]> {
        self.keys.remove(&id)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Load keys from `key_name key` lines
    ///
    /// Lines that do not have exactly two fields or fail validation are
    /// skipped. Returns the number of keys accepted.
    ///
    /// ```
    /// use hoard_crypto::keys::TactKeyStore;
    ///
    /// let mut store = TactKeyStore::new();
    /// let count = store.load_from_txt(
    ///     "FA505078126ACB3E BDC51862ABED79B2DE48C8E7E66C6200\nbroken line here\n",
    /// );
    /// assert_eq!(count, 1);
    /// ```
    pub fn load_from_txt(&mut self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(name), Some(key), None) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };

            if let Ok(key) = TactKey::from_hex_pair(name, key) {
                self.add(key);
                count += 1;
            }
        }

        count
    }

    /// Iterate over all keys
    pub fn iter(&self) -> impl Iterator<Item = TactKey> + '_ {
        self.keys.iter().map(|(&id, &key)| TactKey::new(id, key))
    }
}

impl TactKeyProvider for TactKeyStore {
    fn get_key(&self, key_name: u64) -> Option<[u8; 16]> {
        self.get(key_name).copied()
    }
}
