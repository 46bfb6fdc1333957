//! BLTE (Block Table Encoded) reader
//!
//! BLTE is the chunked container every CASC file is stored in. Each chunk is
//! independently raw, zlib-compressed or encrypted; decoding concatenates the
//! decoded chunks in order.
//!
//! # Example
//!
//! ```
//! use hoard_crypto::TactKeyStore;
//! use hoard_formats::blte::BlteFile;
//!
//! let frame = BlteFile::parse(b"BLTE\0\0\0\0Nhello").unwrap();
//! assert_eq!(frame.decode(&TactKeyStore::new()).unwrap(), b"hello");
//! ```

mod chunk;
mod error;
mod header;

pub use chunk::{ChunkMode, EncryptedHeader, EncryptionType, decode_chunk, inflate};
pub use error::{BlteError, BlteResult};
pub use header::{BLTE_MAGIC, BlteHeader, ChunkInfo, HeaderFlags};

use binrw::BinRead;
use binrw::io::Cursor;
use hoard_crypto::TactKeyProvider;
use md5::{Digest, Md5};

/// A parsed BLTE frame borrowing its chunk bytes
#[derive(Debug, Clone)]
pub struct BlteFile<'a> {
    /// Frame header
    pub header: BlteHeader,
    chunks: Vec<&'a [u8]>,
}

/// Result of a decode that tolerates missing keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDecode {
    /// Decoded bytes; chunks with missing keys are zero-filled
    pub data: Vec<u8>,
    /// Key names that were not available, in chunk order
    pub missing_keys: Vec<u64>,
}

impl PartialDecode {
    /// Whether every chunk was decoded
    pub fn is_complete(&self) -> bool {
        self.missing_keys.is_empty()
    }
}

impl<'a> BlteFile<'a> {
    /// Parse the header and slice the chunks out of `data`
    pub fn parse(data: &'a [u8]) -> BlteResult<Self> {
        let header = BlteHeader::read_be(&mut Cursor::new(data)).map_err(unwrap_custom)?;
        let mut offset = header.data_offset();

        let chunks = if header.is_single_chunk() {
            let rest = &data[offset.min(data.len())..];
            if rest.is_empty() {
                Vec::new()
            } else {
                vec![rest]
            }
        } else {
            let mut chunks = Vec::with_capacity(header.chunks.len());
            for (index, info) in header.chunks.iter().enumerate() {
                let size = info.compressed_size as usize;
                let available = data.len().saturating_sub(offset);
                if size > available {
                    return Err(BlteError::TruncatedChunk {
                        chunk: index,
                        needed: size,
                        available,
                    });
                }
                chunks.push(&data[offset..offset + size]);
                offset += size;
            }
            chunks
        };

        Ok(Self { header, chunks })
    }

    /// Number of chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Stored bytes of chunk `index`, mode byte included
    pub fn chunk(&self, index: usize) -> Option<&'a [u8]> {
        self.chunks.get(index).copied()
    }

    fn expected_size(&self, index: usize) -> Option<usize> {
        self.header
            .chunks
            .get(index)
            .map(|info| info.decompressed_size as usize)
    }

    /// Decode every chunk; a missing key fails the whole frame
    pub fn decode(&self, keys: &dyn TactKeyProvider) -> BlteResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.header.declared_size().unwrap_or(0) as usize);
        for (index, stored) in self.chunks.iter().enumerate() {
            out.extend(decode_chunk(stored, index, self.expected_size(index), keys)?);
        }
        self.check_total(out.len())?;
        Ok(out)
    }

    /// Decode every chunk, zero-filling chunks whose key is unavailable
    ///
    /// Only chunks with a declared size can be zero-filled; a missing key in an
    /// implicit single-chunk frame is still an error.
    pub fn decode_partial(&self, keys: &dyn TactKeyProvider) -> BlteResult<PartialDecode> {
        let mut result = PartialDecode::default();
        for (index, stored) in self.chunks.iter().enumerate() {
            let expected = self.expected_size(index);
            match (decode_chunk(stored, index, expected, keys), expected) {
                (Ok(decoded), _) => result.data.extend(decoded),
                (Err(BlteError::MissingKey(name)), Some(size)) => {
                    result.missing_keys.push(name);
                    result.data.resize(result.data.len() + size, 0);
                }
                (Err(e), _) => return Err(e),
            }
        }
        self.check_total(result.data.len())?;
        Ok(result)
    }

    /// Compare each chunk's MD5 against the chunk table
    pub fn verify_checksums(&self) -> BlteResult<()> {
        for (index, (stored, info)) in self.chunks.iter().zip(&self.header.chunks).enumerate() {
            if Md5::digest(stored).as_slice() != info.checksum {
                return Err(BlteError::ChecksumMismatch(index));
            }
        }
        Ok(())
    }

    fn check_total(&self, actual: usize) -> BlteResult<()> {
        match self.header.declared_size() {
            Some(expected) if expected != actual as u64 => Err(BlteError::TotalSizeMismatch {
                expected,
                actual: actual as u64,
            }),
            _ => Ok(()),
        }
    }
}

/// Decode a complete BLTE frame in one call
pub fn decode(data: &[u8], keys: &dyn TactKeyProvider) -> BlteResult<Vec<u8>> {
    BlteFile::parse(data)?.decode(keys)
}

// Header validation errors travel through binrw as `Custom`; surface the
// original variant.
fn unwrap_custom(err: binrw::Error) -> BlteError {
    match err {
        binrw::Error::Custom { err, pos } => match err.downcast::<BlteError>() {
            Ok(inner) => *inner,
            Err(err) => BlteError::BinRw(binrw::Error::Custom { pos, err }),
        },
        other => BlteError::BinRw(other),
    }
}
