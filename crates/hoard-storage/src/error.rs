//! Storage error taxonomy
//!
//! Every lower-level parser and transport error is folded into one of a small
//! set of categories so callers can decide what to do without matching on
//! each crate's error type. Table-load failures abort the whole open; per-file
//! failures stay local to that call.

use std::time::Duration;

use hoard_formats::blte::BlteError;
use hoard_formats::config::ConfigError;
use hoard_formats::encoding::EncodingError;
use hoard_formats::listfile::ManifestError;
use hoard_formats::mpq::MpqError;
use hoard_formats::root::RootError;
use hoard_protocol::ProtocolError;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while opening a source or reading a file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A table or frame has bad magic, sizes or structure.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A FileDataID, content key or path is not indexed.
    #[error("missing index entry: {0}")]
    MissingIndexEntry(String),

    /// The file exists, but not for the selected locale.
    #[error("no root entry for FileDataID {file_data_id} matches locale 0x{locale:X}")]
    NoLocaleMatch {
        /// Requested file
        file_data_id: u32,
        /// Locale mask used for the lookup
        locale: u32,
    },

    /// Compression or encryption this reader does not handle.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// An encrypted chunk needs a key the key ring does not have.
    #[error("missing decryption key {0:016x}")]
    MissingDecryptionKey(u64),

    /// Chunk or sector data does not match its declared layout.
    #[error("corrupt archive data: {0}")]
    CorruptArchiveData(String),

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote fetch failure.
    #[error("remote fetch failed: {0}")]
    Remote(#[from] ProtocolError),

    /// Operation timed out.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Error category, for callers that branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal to the table being loaded
    MalformedHeader,
    /// Not found; not fatal to the session
    MissingIndexEntry,
    /// Present for another locale
    NoLocaleMatch,
    /// Explicitly unsupported input
    UnsupportedFeature,
    /// Retry once the key is available
    MissingDecryptionKey,
    /// Fatal to the single read
    CorruptArchiveData,
    /// Disk or network failure
    Io,
}

impl StorageError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Self::MissingIndexEntry(_) => ErrorKind::MissingIndexEntry,
            Self::NoLocaleMatch { .. } => ErrorKind::NoLocaleMatch,
            Self::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            Self::MissingDecryptionKey(_) => ErrorKind::MissingDecryptionKey,
            Self::CorruptArchiveData(_) => ErrorKind::CorruptArchiveData,
            Self::Io(_) | Self::Remote(_) | Self::Timeout(_) => ErrorKind::Io,
        }
    }

    /// Whether retrying the same call later can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingDecryptionKey | ErrorKind::Io | ErrorKind::NoLocaleMatch
        )
    }
}

impl From<BlteError> for StorageError {
    fn from(err: BlteError) -> Self {
        match err {
            BlteError::MissingKey(name) => Self::MissingDecryptionKey(name),
            BlteError::UnsupportedChunkMode(mode) => {
                Self::UnsupportedFeature(format!("BLTE chunk mode 0x{mode:02X}"))
            }
            err @ (BlteError::InvalidMagic(_)
            | BlteError::InvalidHeader(_)
            | BlteError::BinRw(_)) => Self::MalformedHeader(err.to_string()),
            other => Self::CorruptArchiveData(other.to_string()),
        }
    }
}

impl From<RootError> for StorageError {
    fn from(err: RootError) -> Self {
        match err {
            RootError::FileNotFound(id) => {
                Self::MissingIndexEntry(format!("FileDataID {id} does not exist in root"))
            }
            RootError::NoLocaleMatch {
                file_data_id,
                locale,
            } => Self::NoLocaleMatch {
                file_data_id: file_data_id.get(),
                locale,
            },
            RootError::Io(e) => Self::Io(e),
            other => Self::MalformedHeader(other.to_string()),
        }
    }
}

impl From<EncodingError> for StorageError {
    fn from(err: EncodingError) -> Self {
        Self::MalformedHeader(err.to_string())
    }
}

impl From<ConfigError> for StorageError {
    fn from(err: ConfigError) -> Self {
        Self::MalformedHeader(format!("build config: {err}"))
    }
}

impl From<ManifestError> for StorageError {
    fn from(err: ManifestError) -> Self {
        Self::MalformedHeader(format!("listfile: {err}"))
    }
}

impl From<MpqError> for StorageError {
    fn from(err: MpqError) -> Self {
        match err {
            MpqError::FileNotFound(name) => Self::MissingIndexEntry(name),
            err @ MpqError::BlockNotPresent { .. } => Self::MissingIndexEntry(err.to_string()),
            err @ (MpqError::EncryptionUnsupported { .. }
            | MpqError::UnsupportedCompression(_)) => Self::UnsupportedFeature(err.to_string()),
            // Header and tables are sized at open; a bad size there is a header fault
            err @ (MpqError::InvalidMagic(_)
            | MpqError::BinRw(_)
            | MpqError::OutOfBounds {
                what: "header" | "hash table" | "block table",
                ..
            }) => Self::MalformedHeader(err.to_string()),
            MpqError::Io(e) => Self::Io(e),
            other => Self::CorruptArchiveData(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use hoard_crypto::FileDataId;

    #[test]
    fn test_blte_mapping() {
        assert_eq!(
            StorageError::from(BlteError::MissingKey(0xFA50_5078_126A_CB3E)).kind(),
            ErrorKind::MissingDecryptionKey
        );
        assert_eq!(
            StorageError::from(BlteError::UnsupportedChunkMode(b'F')).kind(),
            ErrorKind::UnsupportedFeature
        );
        assert_eq!(
            StorageError::from(BlteError::InvalidMagic(*b"NOPE")).kind(),
            ErrorKind::MalformedHeader
        );
        assert_eq!(
            StorageError::from(BlteError::TotalSizeMismatch {
                expected: 10,
                actual: 9
            })
            .kind(),
            ErrorKind::CorruptArchiveData
        );
    }

    #[test]
    fn test_root_mapping() {
        let err = StorageError::from(RootError::NoLocaleMatch {
            file_data_id: FileDataId::new(42),
            locale: 0x200,
        });
        assert!(matches!(
            err,
            StorageError::NoLocaleMatch {
                file_data_id: 42,
                locale: 0x200
            }
        ));
        assert_eq!(
            StorageError::from(RootError::FileNotFound(FileDataId::new(1))).kind(),
            ErrorKind::MissingIndexEntry
        );
    }

    #[test]
    fn test_mpq_mapping() {
        assert_eq!(
            StorageError::from(MpqError::UnsupportedCompression(0x10)).kind(),
            ErrorKind::UnsupportedFeature
        );
        assert_eq!(
            StorageError::from(MpqError::CorruptArchiveData("sector".into())).kind(),
            ErrorKind::CorruptArchiveData
        );
        assert_eq!(
            StorageError::from(MpqError::FileNotFound("a.txt".into())).kind(),
            ErrorKind::MissingIndexEntry
        );
    }

    #[test]
    fn test_mpq_table_bounds_are_header_faults() {
        for what in ["header", "hash table", "block table"] {
            let err = StorageError::from(MpqError::OutOfBounds {
                what,
                offset: 0x20,
                size: 0x1000,
                archive_size: 0x40,
            });
            assert_eq!(err.kind(), ErrorKind::MalformedHeader, "{what}");
        }

        let body = StorageError::from(MpqError::OutOfBounds {
            what: "file body",
            offset: 0x20,
            size: 0x1000,
            archive_size: 0x40,
        });
        assert_eq!(body.kind(), ErrorKind::CorruptArchiveData);
    }

    #[test]
    fn test_recoverable() {
        assert!(StorageError::MissingDecryptionKey(1).is_recoverable());
        assert!(!StorageError::CorruptArchiveData("x".into()).is_recoverable());
    }
}
