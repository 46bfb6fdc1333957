//! Hash and block tables

use std::collections::HashMap;

use binrw::io::Cursor;
use binrw::{BinRead, BinResult};
use hoard_crypto::storm::{HashType, decrypt_bytes, hash_string};

/// Size of one entry in either table
pub const TABLE_ENTRY_SIZE: usize = 16;

/// Block index marking a never-used hash slot
pub const HASH_ENTRY_EMPTY: u32 = 0xFFFF_FFFF;

/// Block index marking a deleted hash slot
pub const HASH_ENTRY_DELETED: u32 = 0xFFFF_FFFE;

/// Block flag bits
pub struct BlockFlags;

impl BlockFlags {
    /// PKWARE DCL compression
    pub const IMPLODE: u32 = 0x0000_0100;
    /// Per-sector compression with a type byte
    pub const COMPRESS: u32 = 0x0000_0200;
    /// Body is encrypted
    pub const ENCRYPTED: u32 = 0x0001_0000;
    /// Encryption key is adjusted by block offset and size
    pub const FIX_KEY: u32 = 0x0002_0000;
    /// Body is a single unit rather than sectors
    pub const SINGLE_UNIT: u32 = 0x0100_0000;
    /// Deletion marker
    pub const DELETE_MARKER: u32 = 0x0200_0000;
    /// Sector checksums follow the sector table
    pub const SECTOR_CRC: u32 = 0x0400_0000;
    /// Block is in use
    pub const EXISTS: u32 = 0x8000_0000;
}

/// Hash table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct HashEntry {
    /// `HashA` of the name
    pub hash_a: u32,
    /// `HashB` of the name
    pub hash_b: u32,
    /// Locale code
    pub locale: u16,
    /// Platform code
    pub platform: u16,
    /// Index into the block table
    pub block_index: u32,
}

impl HashEntry {
    /// Whether the slot refers to a block
    pub const fn is_used(&self) -> bool {
        self.block_index != HASH_ENTRY_EMPTY && self.block_index != HASH_ENTRY_DELETED
    }
}

/// Block table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct BlockEntry {
    /// Offset of the body from the archive start
    pub offset: u32,
    /// Stored size
    pub archive_size: u32,
    /// Uncompressed size
    pub size: u32,
    /// [`BlockFlags`] bits
    pub flags: u32,
}

impl BlockEntry {
    const fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Block is in use
    pub const fn exists(&self) -> bool {
        self.has(BlockFlags::EXISTS)
    }

    /// Sectors carry a compression type byte
    pub const fn is_compressed(&self) -> bool {
        self.has(BlockFlags::COMPRESS)
    }

    /// PKWARE DCL compressed
    pub const fn is_imploded(&self) -> bool {
        self.has(BlockFlags::IMPLODE)
    }

    /// Body is encrypted
    pub const fn is_encrypted(&self) -> bool {
        self.has(BlockFlags::ENCRYPTED)
    }

    /// Key is adjusted by offset and size
    pub const fn has_fix_key(&self) -> bool {
        self.has(BlockFlags::FIX_KEY)
    }

    /// Body is one unit
    pub const fn is_single_unit(&self) -> bool {
        self.has(BlockFlags::SINGLE_UNIT)
    }
}

/// Decryption key for a table, e.g. `"(hash table)"`
pub fn table_key(table_name: &str) -> u32 {
    hash_string(table_name, HashType::Table)
}

fn read_entries<T>(encrypted: &[u8], key: u32, count: usize) -> BinResult<Vec<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let mut reader = Cursor::new(decrypt_bytes(encrypted, key));
    (0..count).map(|_| T::read_le(&mut reader)).collect()
}

/// Decrypted hash table keyed by `(hash_a, hash_b)`
#[derive(Debug, Clone, Default)]
pub struct HashTable {
    entries: HashMap<(u32, u32), HashEntry>,
}

impl HashTable {
    /// Decrypt and index `count` entries
    ///
    /// Empty and deleted slots are dropped. When two slots share a name hash
    /// (one per locale), the later slot wins.
    pub fn parse(encrypted: &[u8], count: usize) -> BinResult<Self> {
        let entries = read_entries::<HashEntry>(encrypted, table_key("(hash table)"), count)?
            .into_iter()
            .filter(HashEntry::is_used)
            .map(|entry| ((entry.hash_a, entry.hash_b), entry))
            .collect();
        Ok(Self { entries })
    }

    /// Entry for a member name (case-insensitive, `\` separated)
    pub fn get(&self, name: &str) -> Option<&HashEntry> {
        let key = (
            hash_string(name, HashType::HashA),
            hash_string(name, HashType::HashB),
        );
        self.entries.get(&key)
    }

    /// Number of used slots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no slot is used
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decrypted block table
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Decrypt and parse `count` entries
    pub fn parse(encrypted: &[u8], count: usize) -> BinResult<Self> {
        Ok(Self {
            entries: read_entries(encrypted, table_key("(block table)"), count)?,
        })
    }

    /// Entry at `index`
    pub fn get(&self, index: u32) -> Option<&BlockEntry> {
        self.entries.get(index as usize)
    }

    /// All entries
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
