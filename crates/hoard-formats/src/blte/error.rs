//! BLTE error types

use thiserror::Error;

/// BLTE-specific error type
#[derive(Debug, Error)]
pub enum BlteError {
    /// Invalid BLTE magic bytes
    #[error("invalid BLTE magic: expected [42 4C 54 45], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Header fields are inconsistent
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Chunk table points past the end of the data
    #[error("truncated chunk {chunk}: need {needed} bytes, {available} available")]
    TruncatedChunk {
        /// Chunk index
        chunk: usize,
        /// Bytes the chunk table declares
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Mode byte is not one this reader decodes
    #[error("unsupported chunk mode: 0x{0:02X}")]
    UnsupportedChunkMode(u8),

    /// Decoded chunk length differs from the chunk table
    #[error("chunk {chunk} decoded to {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Chunk index
        chunk: usize,
        /// Declared decompressed size
        expected: usize,
        /// Actual decoded size
        actual: usize,
    },

    /// Decoded frame length differs from the sum of the chunk table
    #[error("frame decoded to {actual} bytes, chunk table declares {expected}")]
    TotalSizeMismatch {
        /// Sum of declared chunk sizes
        expected: u64,
        /// Actual decoded length
        actual: u64,
    },

    /// MD5 of the stored chunk differs from the chunk table
    #[error("checksum mismatch in chunk {0}")]
    ChecksumMismatch(usize),

    /// zlib stream failed to inflate
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Encrypted chunk header is malformed
    #[error("invalid encrypted chunk: {0}")]
    InvalidEncryptedChunk(String),

    /// An encrypted chunk decrypted to another encrypted chunk
    #[error("nested encryption is not allowed")]
    NestedEncryption,

    /// The key needed to decrypt a chunk is not available
    #[error("missing decryption key {0:016x}")]
    MissingKey(u64),

    /// Cipher setup failed
    #[error("crypto error: {0}")]
    Crypto(#[from] hoard_crypto::CryptoError),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for BLTE operations
pub type BlteResult<T> = Result<T, BlteError>;
