//! Sector decompression

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::error::{MpqError, Result};

/// Compression type byte for zlib
pub const COMPRESSION_ZLIB: u8 = 0x02;

/// Compression type byte for bzip2
pub const COMPRESSION_BZIP2: u8 = 0x10;

/// Compression type byte for PKWARE DCL (imploded bodies)
pub const COMPRESSION_IMPLODE: u8 = 0x08;

/// Decompress a sector that starts with a compression type byte
///
/// Only zlib is supported; any other type, bzip2 included, is refused rather
/// than returned undecoded.
pub fn decompress_sector(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let (&compression, payload) = data
        .split_first()
        .ok_or_else(|| MpqError::CorruptArchiveData("empty compressed sector".to_string()))?;

    match compression {
        COMPRESSION_ZLIB => {
            let mut out = Vec::with_capacity(expected_size);
            ZlibDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|e| MpqError::Decompression(e.to_string()))?;
            Ok(out)
        }
        other => Err(MpqError::UnsupportedCompression(other)),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::zlib_compress;

    #[test]
    fn test_zlib_sector() {
        let mut sector = vec![COMPRESSION_ZLIB];
        sector.extend(zlib_compress(b"sector payload"));
        assert_eq!(decompress_sector(&sector, 14).expect("inflate"), b"sector payload");
    }

    #[test]
    fn test_bzip2_is_unsupported() {
        let err = decompress_sector(&[COMPRESSION_BZIP2, 1, 2, 3], 10).unwrap_err();
        assert!(matches!(err, MpqError::UnsupportedCompression(0x10)));
    }

    #[test]
    fn test_corrupt_zlib_stream() {
        let err = decompress_sector(&[COMPRESSION_ZLIB, 0xDE, 0xAD], 10).unwrap_err();
        assert!(matches!(err, MpqError::Decompression(_)));
    }
}
