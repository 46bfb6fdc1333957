//! Error types for root table parsing and lookup

use hoard_crypto::FileDataId;
use thiserror::Error;

/// Errors that can occur when parsing or querying a root table
#[derive(Error, Debug)]
pub enum RootError {
    /// A block runs past the end of the table
    #[error("truncated root block at offset {0}")]
    TruncatedBlock(u64),

    /// Header counts are inconsistent
    #[error("invalid root header: {0}")]
    InvalidHeader(String),

    /// FileDataID deltas overflowed the ID range
    #[error("invalid FileDataID delta sequence at offset {0}")]
    InvalidDelta(u64),

    /// The FileDataID is not present in the table
    #[error("FileDataID {0} does not exist in root")]
    FileNotFound(FileDataId),

    /// The FileDataID exists, but no root type matches the locale
    #[error("no root entry for FileDataID {file_data_id} matches locale 0x{locale:X}")]
    NoLocaleMatch {
        /// The requested file
        file_data_id: FileDataId,
        /// Locale mask used for the lookup
        locale: u32,
    },

    /// I/O error while seeking within the table
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `BinRW` parsing error
    #[error("binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Type alias for root table results
pub type Result<T> = std::result::Result<T, RootError>;
