//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key size
    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize {
        /// Expected key size in bytes
        expected: usize,
        /// Actual key size in bytes
        actual: usize,
    },

    /// Invalid IV size
    #[error("Invalid IV size: expected 4 or 8, got {0}")]
    InvalidIvSize(usize),

    /// Invalid key name or key text
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Hex decoding failed
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
