//! Error types for encoding table parsing

use thiserror::Error;

/// Errors that can occur when parsing an encoding table
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum EncodingError {
    #[error("invalid magic: expected 'EN', got {0:02X?}")]
    InvalidMagic([u8; 2]),

    #[error("unsupported {field} size {value}, expected 16")]
    UnsupportedKeySize { field: &'static str, value: u8 },

    #[error("invalid page size: {0}")]
    InvalidPageSize(usize),

    #[error("encoding table truncated: page {page} needs {needed} bytes, {available} available")]
    Truncated {
        page: u32,
        needed: usize,
        available: usize,
    },

    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for encoding table operations
pub type Result<T> = std::result::Result<T, EncodingError>;
