//! BLTE frame header

use binrw::io::{Read, Seek};
use binrw::{BinRead, BinResult};

use super::error::BlteError;

/// BLTE magic bytes
pub const BLTE_MAGIC: [u8; 4] = *b"BLTE";

/// Size of magic plus the header size field
pub const PREAMBLE_SIZE: usize = 8;

/// Chunk table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderFlags {
    /// 24 bytes per chunk: sizes and MD5 of the stored chunk
    Standard = 0x0F,
    /// 40 bytes per chunk: adds MD5 of the decoded chunk
    Extended = 0x10,
}

impl HeaderFlags {
    /// Parse from byte value
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x0F => Some(Self::Standard),
            0x10 => Some(Self::Extended),
            _ => None,
        }
    }

    /// Bytes per chunk table entry
    pub fn chunk_info_size(self) -> usize {
        match self {
            Self::Standard => 24,
            Self::Extended => 40,
        }
    }
}

/// One row of the chunk table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Stored size including the mode byte
    pub compressed_size: u32,
    /// Size after decoding
    pub decompressed_size: u32,
    /// MD5 of the stored chunk
    pub checksum: [u8; 16],
}

/// Parsed frame header
#[derive(Debug, Clone)]
pub struct BlteHeader {
    /// Total header size including the preamble; `0` when there is no chunk table
    pub header_size: u32,
    /// Chunk table layout, absent for implicit single-chunk frames
    pub flags: Option<HeaderFlags>,
    /// Chunk table; empty means the payload is one implicit chunk
    pub chunks: Vec<ChunkInfo>,
}

fn custom_error(pos: u64, err: BlteError) -> binrw::Error {
    binrw::Error::Custom {
        pos,
        err: Box::new(err),
    }
}

impl BinRead for BlteHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let start = reader.stream_position()?;

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != BLTE_MAGIC {
            return Err(custom_error(start, BlteError::InvalidMagic(magic)));
        }

        let header_size = u32::read_be(reader)?;
        if header_size == 0 {
            return Ok(Self {
                header_size,
                flags: None,
                chunks: Vec::new(),
            });
        }

        let flag_byte = u8::read_be(reader)?;
        let flags = HeaderFlags::from_byte(flag_byte).ok_or_else(|| {
            custom_error(
                start,
                BlteError::InvalidHeader(format!("unknown chunk table flags 0x{flag_byte:02X}")),
            )
        })?;

        let count_bytes = <[u8; 3]>::read_be(reader)?;
        let chunk_count = u32::from_be_bytes([0, count_bytes[0], count_bytes[1], count_bytes[2]]);
        let expected = PREAMBLE_SIZE + 4 + chunk_count as usize * flags.chunk_info_size();
        // An empty chunk table leaves one implicit chunk after the header
        if header_size as usize != expected {
            return Err(custom_error(
                start,
                BlteError::InvalidHeader(format!(
                    "header size {header_size} does not match {chunk_count} chunks ({expected})"
                )),
            ));
        }

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            let compressed_size = u32::read_be(reader)?;
            let decompressed_size = u32::read_be(reader)?;
            let checksum = <[u8; 16]>::read_be(reader)?;
            if flags == HeaderFlags::Extended {
                // MD5 of the decoded chunk, unused
                <[u8; 16]>::read_be(reader)?;
            }
            chunks.push(ChunkInfo {
                compressed_size,
                decompressed_size,
                checksum,
            });
        }

        Ok(Self {
            header_size,
            flags: Some(flags),
            chunks,
        })
    }
}

impl BlteHeader {
    /// Whether the frame is one implicit chunk
    ///
    /// True for a zero header size and for a chunk table with no entries.
    pub fn is_single_chunk(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Offset of the first chunk
    pub fn data_offset(&self) -> usize {
        if self.header_size == 0 {
            PREAMBLE_SIZE
        } else {
            self.header_size as usize
        }
    }

    /// Sum of declared decoded sizes, if the frame has a chunk table
    pub fn declared_size(&self) -> Option<u64> {
        if self.is_single_chunk() {
            None
        } else {
            Some(
                self.chunks
                    .iter()
                    .map(|info| u64::from(info.decompressed_size))
                    .sum(),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    fn header_bytes(flags: u8, infos: &[(u32, u32)]) -> Vec<u8> {
        let info_size = if flags == 0x10 { 40 } else { 24 };
        let mut out = b"BLTE".to_vec();
        out.extend_from_slice(&((12 + infos.len() * info_size) as u32).to_be_bytes());
        out.push(flags);
        out.extend_from_slice(&(infos.len() as u32).to_be_bytes()[1..]);
        for (compressed, decompressed) in infos {
            out.extend_from_slice(&compressed.to_be_bytes());
            out.extend_from_slice(&decompressed.to_be_bytes());
            out.extend_from_slice(&[0xAB; 16]);
            if flags == 0x10 {
                out.extend_from_slice(&[0xCD; 16]);
            }
        }
        out
    }

    #[test]
    fn test_single_chunk_header() {
        let data = b"BLTE\0\0\0\0Nhello";
        let header = BlteHeader::read_be(&mut Cursor::new(&data[..])).expect("header");
        assert!(header.is_single_chunk());
        assert_eq!(header.data_offset(), 8);
        assert_eq!(header.declared_size(), None);
    }

    #[test]
    fn test_standard_chunk_table() {
        let data = header_bytes(0x0F, &[(6, 5), (11, 100)]);
        let header = BlteHeader::read_be(&mut Cursor::new(&data)).expect("header");
        assert_eq!(header.flags, Some(HeaderFlags::Standard));
        assert_eq!(header.chunks.len(), 2);
        assert_eq!(header.chunks[1].compressed_size, 11);
        assert_eq!(header.data_offset(), 12 + 48);
        assert_eq!(header.declared_size(), Some(105));
    }

    #[test]
    fn test_extended_chunk_table() {
        let data = header_bytes(0x10, &[(6, 5)]);
        let header = BlteHeader::read_be(&mut Cursor::new(&data)).expect("header");
        assert_eq!(header.flags, Some(HeaderFlags::Extended));
        assert_eq!(header.data_offset(), 52);
    }

    #[test]
    fn test_bad_magic() {
        let err = BlteHeader::read_be(&mut Cursor::new(b"BLTX\0\0\0\0")).unwrap_err();
        assert!(err.to_string().contains("invalid BLTE magic"));
    }

    #[test]
    fn test_empty_chunk_table_is_single_chunk() {
        let data = b"BLTE\0\0\0\x0c\x0f\0\0\0Nhello";
        let header = BlteHeader::read_be(&mut Cursor::new(&data[..])).expect("header");
        assert!(header.is_single_chunk());
        assert_eq!(header.flags, Some(HeaderFlags::Standard));
        assert_eq!(header.data_offset(), 12);
        assert_eq!(header.declared_size(), None);
    }

    #[test]
    fn test_header_size_mismatch() {
        let mut data = header_bytes(0x0F, &[(6, 5)]);
        data[7] = 99;
        assert!(BlteHeader::read_be(&mut Cursor::new(&data)).is_err());
    }
}
