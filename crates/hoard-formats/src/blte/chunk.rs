//! Per-chunk decoding: raw, zlib and encrypted payloads

use std::io::Read;

use flate2::read::ZlibDecoder;
use hoard_crypto::salsa20::decrypt_salsa20;
use hoard_crypto::{Arc4Cipher, TactKeyProvider};

use super::error::{BlteError, BlteResult};

/// Chunk mode tag, the first byte of every stored chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkMode {
    /// Stored as-is
    Raw = b'N',
    /// zlib stream
    ZLib = b'Z',
    /// Encrypted envelope around another chunk
    Encrypted = b'E',
}

impl ChunkMode {
    /// Parse a mode tag; modes this reader cannot decode return `None`
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'N' => Some(Self::Raw),
            b'Z' => Some(Self::ZLib),
            b'E' => Some(Self::Encrypted),
            _ => None,
        }
    }

    /// Tag byte
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Cipher named by an encrypted chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionType {
    /// Salsa20 with a 16-byte key
    Salsa20 = b'S',
    /// ARC4
    Arc4 = b'A',
}

impl EncryptionType {
    /// Parse from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'S' => Some(Self::Salsa20),
            b'A' => Some(Self::Arc4),
            _ => None,
        }
    }
}

/// Envelope of an encrypted chunk
///
/// Layout after the `E` tag:
/// `[key_name_size:1 = 8] [key_name:8 LE] [iv_size:1 = 4|8] [iv] [type:1] [ciphertext]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedHeader {
    /// Name of the key that decrypts the payload
    pub key_name: u64,
    /// Initialization vector, 4 or 8 bytes
    pub iv: Vec<u8>,
    /// Cipher
    pub encryption_type: EncryptionType,
}

impl EncryptedHeader {
    /// Split an encrypted payload (without its `E` tag) into header and ciphertext
    pub fn parse(data: &[u8]) -> BlteResult<(Self, &[u8])> {
        let invalid = |msg: &str| BlteError::InvalidEncryptedChunk(msg.to_string());

        let (&key_name_size, rest) = data
            .split_first()
            .ok_or_else(|| invalid("missing key name size"))?;
        if key_name_size != 8 {
            return Err(BlteError::InvalidEncryptedChunk(format!(
                "key name size {key_name_size}, expected 8"
            )));
        }
        if rest.len() < 8 {
            return Err(invalid("truncated key name"));
        }
        let (name_bytes, rest) = rest.split_at(8);
        let mut name = [0u8; 8];
        name.copy_from_slice(name_bytes);
        let key_name = u64::from_le_bytes(name);

        let (&iv_size, rest) = rest
            .split_first()
            .ok_or_else(|| invalid("missing IV size"))?;
        if iv_size != 4 && iv_size != 8 {
            return Err(BlteError::InvalidEncryptedChunk(format!(
                "IV size {iv_size}, expected 4 or 8"
            )));
        }
        if rest.len() < iv_size as usize {
            return Err(invalid("truncated IV"));
        }
        let (iv, rest) = rest.split_at(iv_size as usize);

        let (&type_byte, ciphertext) = rest
            .split_first()
            .ok_or_else(|| invalid("missing encryption type"))?;
        let encryption_type = EncryptionType::from_byte(type_byte).ok_or_else(|| {
            BlteError::InvalidEncryptedChunk(format!("unknown encryption type 0x{type_byte:02X}"))
        })?;

        Ok((
            Self {
                key_name,
                iv: iv.to_vec(),
                encryption_type,
            },
            ciphertext,
        ))
    }

    /// Decrypt `ciphertext` with `key` for chunk `chunk_index`
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8; 16],
        chunk_index: usize,
    ) -> BlteResult<Vec<u8>> {
        match self.encryption_type {
            EncryptionType::Salsa20 => Ok(decrypt_salsa20(ciphertext, key, &self.iv, chunk_index)?),
            EncryptionType::Arc4 => Ok(Arc4Cipher::new(key)?.decrypt(ciphertext)),
        }
    }
}

/// Inflate a zlib stream
pub fn inflate(data: &[u8], size_hint: usize) -> BlteResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(size_hint);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| BlteError::Decompression(e.to_string()))?;
    Ok(out)
}

/// Decode one stored chunk (mode byte included)
///
/// `expected` is the declared decoded size, absent for implicit single-chunk
/// frames. Encrypted chunks are unwrapped once and their plaintext decoded as a
/// chunk of its own.
pub fn decode_chunk(
    stored: &[u8],
    chunk_index: usize,
    expected: Option<usize>,
    keys: &dyn TactKeyProvider,
) -> BlteResult<Vec<u8>> {
    decode_inner(stored, chunk_index, expected, keys, true)
}

fn decode_inner(
    stored: &[u8],
    chunk_index: usize,
    expected: Option<usize>,
    keys: &dyn TactKeyProvider,
    allow_encrypted: bool,
) -> BlteResult<Vec<u8>> {
    let (&tag, payload) = stored.split_first().ok_or(BlteError::TruncatedChunk {
        chunk: chunk_index,
        needed: 1,
        available: 0,
    })?;

    let decoded = match ChunkMode::from_byte(tag) {
        Some(ChunkMode::Raw) => payload.to_vec(),
        Some(ChunkMode::ZLib) => inflate(payload, expected.unwrap_or(payload.len() * 4))?,
        Some(ChunkMode::Encrypted) => {
            if !allow_encrypted {
                return Err(BlteError::NestedEncryption);
            }
            let (header, ciphertext) = EncryptedHeader::parse(payload)?;
            let key = keys
                .get_key(header.key_name)
                .ok_or(BlteError::MissingKey(header.key_name))?;
            let plaintext = header.decrypt(ciphertext, &key, chunk_index)?;
            return decode_inner(&plaintext, chunk_index, expected, keys, false);
        }
        None => return Err(BlteError::UnsupportedChunkMode(tag)),
    };

    if let Some(expected) = expected
        && decoded.len() != expected
    {
        return Err(BlteError::SizeMismatch {
            chunk: chunk_index,
            expected,
            actual: decoded.len(),
        });
    }

    Ok(decoded)
}

/// Key name of an encrypted chunk, if `stored` is one
pub fn encrypted_key_name(stored: &[u8]) -> Option<u64> {
    match stored.split_first() {
        Some((&tag, payload)) if tag == ChunkMode::Encrypted.as_byte() => {
            EncryptedHeader::parse(payload)
                .ok()
                .map(|(header, _)| header.key_name)
        }
        _ => None,
    }
}
