//! MPQ crypt table, name hash and table cipher
//!
//! Every MPQ operation that touches hashing or encryption shares one
//! 1280-entry table built from a linear congruential generator. The table is
//! split into five 256-entry rows: rows 0-3 feed the four [`HashType`]s and
//! row 4 drives the decryption keystream.
//!
//! All arithmetic is 32-bit and wraps after every add and shift.

use std::sync::LazyLock;

/// Number of entries in the crypt table
pub const CRYPT_TABLE_SIZE: usize = 0x500;

const SEED1_INIT: u32 = 0x7FED_7FED;
const SEED2_INIT: u32 = 0xEEEE_EEEE;
const KEYSTREAM_ROW: usize = 0x400;

static CRYPT_TABLE: LazyLock<[u32; CRYPT_TABLE_SIZE]> = LazyLock::new(build_crypt_table);

/// Selects which row of the crypt table a hash is folded through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum HashType {
    /// Starting slot in the hash table
    TableOffset = 0,
    /// First verification hash stored in a hash entry
    HashA = 1,
    /// Second verification hash stored in a hash entry
    HashB = 2,
    /// Key for decrypting tables and files
    Table = 3,
}

fn build_crypt_table() -> [u32; CRYPT_TABLE_SIZE] {
    let mut table = [0u32; CRYPT_TABLE_SIZE];
    let mut seed: u32 = 0x0010_0001;

    for row_start in 0..0x100 {
        for column in 0..5 {
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let high = (seed & 0xFFFF) << 16;

            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let low = seed & 0xFFFF;

            table[row_start + column * 0x100] = high | low;
        }
    }

    table
}

/// The shared crypt table, built on first use
pub fn crypt_table() -> &'static [u32; CRYPT_TABLE_SIZE] {
    &CRYPT_TABLE
}

/// Hash a file or table name
///
/// ASCII letters are upper-cased before hashing so `"war3map.j"` and
/// `"WAR3MAP.J"` collide on purpose.
pub fn hash_string(name: &str, hash_type: HashType) -> u32 {
    let table = crypt_table();
    let row = (hash_type as usize) << 8;
    let mut seed1 = SEED1_INIT;
    let mut seed2 = SEED2_INIT;

    for byte in name.bytes() {
        let ch = u32::from(byte.to_ascii_uppercase());
        seed1 = table[row + ch as usize] ^ seed1.wrapping_add(seed2);
        seed2 = ch
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

#[inline]
fn advance_key(key: u32) -> u32 {
    ((!key) << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B)
}

/// Decrypt a run of little-endian words in place
pub fn decrypt_block(words: &mut [u32], key: u32) {
    let table = crypt_table();
    let mut seed1 = key;
    let mut seed2 = SEED2_INIT;

    for word in words.iter_mut() {
        seed2 = seed2.wrapping_add(table[KEYSTREAM_ROW + (seed1 & 0xFF) as usize]);
        let plain = *word ^ seed1.wrapping_add(seed2);

        seed1 = advance_key(seed1);
        seed2 = plain
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
        *word = plain;
    }
}

/// Encrypt a run of words in place; inverse of [`decrypt_block`]
pub fn encrypt_block(words: &mut [u32], key: u32) {
    let table = crypt_table();
    let mut seed1 = key;
    let mut seed2 = SEED2_INIT;

    for word in words.iter_mut() {
        seed2 = seed2.wrapping_add(table[KEYSTREAM_ROW + (seed1 & 0xFF) as usize]);
        let plain = *word;
        *word = plain ^ seed1.wrapping_add(seed2);

        seed1 = advance_key(seed1);
        seed2 = plain
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }
}

fn bytes_to_words(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn words_into_bytes(words: &[u32], tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4 + tail.len());
    for word in words {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(tail);
    out
}

/// Decrypt a byte buffer
///
/// Trailing bytes that do not fill a whole word are copied unchanged.
pub fn decrypt_bytes(data: &[u8], key: u32) -> Vec<u8> {
    let mut words = bytes_to_words(data);
    decrypt_block(&mut words, key);
    words_into_bytes(&words, &data[words.len() * 4..])
}

/// Encrypt a byte buffer; inverse of [`decrypt_bytes`]
pub fn encrypt_bytes(data: &[u8], key: u32) -> Vec<u8> {
    let mut words = bytes_to_words(data);
    encrypt_block(&mut words, key);
    words_into_bytes(&words, &data[words.len() * 4..])
}

/// Key protecting an encrypted file body
///
/// Derived from the file name without its directory. Archives that set the
/// fix-key flag additionally mix in the block offset and uncompressed size.
pub fn file_key(path: &str, block_offset: u32, file_size: u32, fix_key: bool) -> u32 {
    let name = path.rsplit(['\\', '/']).next().unwrap_or(path);
    let key = hash_string(name, HashType::Table);

    if fix_key {
        key.wrapping_add(block_offset) ^ file_size
    } else {
        key
    }
}
