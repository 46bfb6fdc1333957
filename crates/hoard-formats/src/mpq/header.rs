//! MPQ archive header

use binrw::BinRead;

/// `MPQ\x1A`
pub const MPQ_MAGIC: [u8; 4] = *b"MPQ\x1A";

/// Size of the version 0 header
pub const HEADER_SIZE_V0: usize = 0x20;

/// Size of the version 1 header
pub const HEADER_SIZE_V1: usize = 0x2C;

/// Fields added by format version 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct MpqHeaderExt {
    /// Offset of the high 16 bits of each block offset
    pub hi_block_table_offset: u64,
    /// High 16 bits of the hash table offset
    pub hash_table_offset_high: u16,
    /// High 16 bits of the block table offset
    pub block_table_offset_high: u16,
}

/// Archive header
#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct MpqHeader {
    /// `MPQ\x1A`
    pub magic: [u8; 4],
    /// Declared header size
    pub header_size: u32,
    /// Declared archive size
    pub archive_size: u32,
    /// Format version; 0 is the original layout, 1 adds [`MpqHeaderExt`]
    pub format_version: u16,
    /// Sector size is `512 << sector_shift`
    pub sector_shift: u16,
    /// Offset of the hash table (low 32 bits)
    pub hash_table_offset: u32,
    /// Offset of the block table (low 32 bits)
    pub block_table_offset: u32,
    /// Number of hash table entries
    pub hash_table_entries: u32,
    /// Number of block table entries
    pub block_table_entries: u32,
    /// Extended fields, present from format version 1
    #[br(if(format_version >= 1))]
    pub extended: Option<MpqHeaderExt>,
}

impl MpqHeader {
    /// Size of a sector in bytes
    pub fn sector_size(&self) -> usize {
        512usize << self.sector_shift
    }

    /// Full hash table offset
    pub fn hash_table_pos(&self) -> u64 {
        let high = self.extended.map_or(0, |ext| ext.hash_table_offset_high);
        (u64::from(high) << 32) | u64::from(self.hash_table_offset)
    }

    /// Full block table offset
    pub fn block_table_pos(&self) -> u64 {
        let high = self.extended.map_or(0, |ext| ext.block_table_offset_high);
        (u64::from(high) << 32) | u64::from(self.block_table_offset)
    }
}
