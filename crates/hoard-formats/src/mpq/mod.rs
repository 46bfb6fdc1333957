//! MPQ archive reader
//!
//! MPQ archives hold a fixed header followed by file bodies and two encrypted
//! tables. The hash table locates a member by two independent hashes of its
//! name; the block table gives the body's offset, sizes and flags. Bodies are
//! stored either as one unit or as sectors, each optionally zlib-compressed.
//!
//! File-level encryption, bzip2 and PKWARE compression are refused with an
//! explicit error.

mod archive;
mod compression;
mod error;
mod header;
mod tables;

pub use archive::{LISTFILE_NAME, MpqArchive};
pub use compression::{
    COMPRESSION_BZIP2, COMPRESSION_IMPLODE, COMPRESSION_ZLIB, decompress_sector,
};
pub use error::{MpqError, Result};
pub use header::{HEADER_SIZE_V0, HEADER_SIZE_V1, MPQ_MAGIC, MpqHeader, MpqHeaderExt};
pub use tables::{
    BlockEntry, BlockFlags, BlockTable, HASH_ENTRY_DELETED, HASH_ENTRY_EMPTY, HashEntry,
    HashTable, TABLE_ENTRY_SIZE, table_key,
};
