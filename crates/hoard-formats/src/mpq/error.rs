//! MPQ error types

use thiserror::Error;

/// Errors raised while opening an archive or reading a member
#[derive(Debug, Error)]
pub enum MpqError {
    /// Header magic is not `MPQ\x1A`
    #[error("invalid MPQ magic: {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Header or table does not fit inside the archive
    #[error("{what} at offset {offset} with size {size} exceeds archive size {archive_size}")]
    OutOfBounds {
        /// Structure being read
        what: &'static str,
        /// Start offset
        offset: u64,
        /// Byte length
        size: u64,
        /// Archive length
        archive_size: u64,
    },

    /// No hash table entry for the name
    #[error("file not found in hash table: {0}")]
    FileNotFound(String),

    /// Hash entry points at a missing or deleted block
    #[error("block {index} for {name} does not exist")]
    BlockNotPresent {
        /// Member name
        name: String,
        /// Block table index
        index: u32,
    },

    /// File bodies are encrypted; only table decryption is supported
    #[error("encrypted file {name} is not supported (key 0x{key:08X})")]
    EncryptionUnsupported {
        /// Member name
        name: String,
        /// Key the body would be decrypted with
        key: u32,
    },

    /// Compression type byte other than zlib
    #[error("unsupported compression type 0x{0:02X}")]
    UnsupportedCompression(u8),

    /// Sector table or sector contents are inconsistent
    #[error("corrupt archive data: {0}")]
    CorruptArchiveData(String),

    /// zlib stream failed to inflate
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// I/O error opening the archive
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for MPQ operations
pub type Result<T> = std::result::Result<T, MpqError>;
