//! Encoding table header

use binrw::BinRead;

use super::error::{EncodingError, Result};

/// Encoding magic bytes, `0x4E45` read little-endian
pub const ENCODING_MAGIC: [u8; 2] = *b"EN";

/// Header size in bytes
pub const HEADER_SIZE: usize = 22;

/// Encoding table header (22 bytes, big-endian)
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct EncodingHeader {
    /// Magic bytes: 'EN'
    pub magic: [u8; 2],
    /// Format version
    pub version: u8,
    /// Size of content keys
    pub ckey_size: u8,
    /// Size of encoding keys
    pub ekey_size: u8,
    /// Content key page size in KiB
    pub ckey_page_size_kb: u16,
    /// Encoding key page size in KiB
    pub ekey_page_size_kb: u16,
    /// Number of content key pages
    pub ckey_page_count: u32,
    /// Number of encoding key pages
    pub ekey_page_count: u32,
    /// Reserved
    pub flags: u8,
    /// Size of the encoding spec string block that follows the header
    pub espec_block_size: u32,
}

impl EncodingHeader {
    /// Check the fields the page reader depends on
    pub fn validate(&self) -> Result<()> {
        if self.magic != ENCODING_MAGIC {
            return Err(EncodingError::InvalidMagic(self.magic));
        }
        if self.ckey_size != 16 {
            return Err(EncodingError::UnsupportedKeySize {
                field: "content key",
                value: self.ckey_size,
            });
        }
        if self.ekey_size != 16 {
            return Err(EncodingError::UnsupportedKeySize {
                field: "encoding key",
                value: self.ekey_size,
            });
        }
        if self.ckey_page_size_kb == 0 {
            return Err(EncodingError::InvalidPageSize(0));
        }
        Ok(())
    }

    /// Content key page size in bytes
    pub fn ckey_page_size(&self) -> usize {
        usize::from(self.ckey_page_size_kb) * 1024
    }

    /// Offset of the first content key page
    ///
    /// The espec block and the page index (first key and MD5 per page) sit
    /// between the header and the pages.
    pub fn ckey_pages_offset(&self) -> usize {
        HEADER_SIZE
            + self.espec_block_size as usize
            + self.ckey_page_count as usize * (usize::from(self.ckey_size) + 16)
    }
}
