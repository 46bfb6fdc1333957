//! Read-only MPQ archive

use std::fs::File;
use std::path::{Path, PathBuf};

use binrw::BinRead;
use binrw::io::Cursor;
use hoard_crypto::storm::file_key;
use memmap2::Mmap;

use super::compression::{COMPRESSION_IMPLODE, decompress_sector};
use super::error::{MpqError, Result};
use super::header::{HEADER_SIZE_V0, MPQ_MAGIC, MpqHeader};
use super::tables::{BlockEntry, BlockTable, HashEntry, HashTable, TABLE_ENTRY_SIZE};

/// Name of the member listing the archive's file names
pub const LISTFILE_NAME: &str = "(listfile)";

/// Largest sector shift accepted (sector size 4 GiB)
const MAX_SECTOR_SHIFT: u16 = 23;

enum ArchiveData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for ArchiveData {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => &map[..],
            Self::Owned(bytes) => bytes.as_slice(),
        }
    }
}

/// An opened MPQ archive
///
/// Tables are decrypted once at open time and never change afterwards, so an
/// archive can be shared between threads and read without locking.
pub struct MpqArchive {
    path: Option<PathBuf>,
    data: ArchiveData,
    header: MpqHeader,
    hash_table: HashTable,
    block_table: BlockTable,
}

impl std::fmt::Debug for MpqArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpqArchive")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("hash_entries", &self.hash_table.len())
            .field("block_entries", &self.block_table.len())
            .finish_non_exhaustive()
    }
}

impl MpqArchive {
    /// Memory-map and open an archive on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        // The mapping is read-only; archives are not modified while open
        #[allow(unsafe_code)]
        let map = unsafe { Mmap::map(&file)? };

        let mut archive = Self::from_data(ArchiveData::Mapped(map))?;
        archive.path = Some(path.to_path_buf());
        Ok(archive)
    }

    /// Open an archive held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_data(ArchiveData::Owned(bytes))
    }

    fn from_data(data: ArchiveData) -> Result<Self> {
        let bytes = data.as_ref();
        if bytes.len() < HEADER_SIZE_V0 {
            return Err(MpqError::OutOfBounds {
                what: "header",
                offset: 0,
                size: HEADER_SIZE_V0 as u64,
                archive_size: bytes.len() as u64,
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if magic != MPQ_MAGIC {
            return Err(MpqError::InvalidMagic(magic));
        }

        let header = MpqHeader::read(&mut Cursor::new(bytes))?;
        if header.sector_shift > MAX_SECTOR_SHIFT {
            return Err(MpqError::CorruptArchiveData(format!(
                "sector shift {} out of range",
                header.sector_shift
            )));
        }

        let hash_bytes = table_slice(
            bytes,
            "hash table",
            header.hash_table_pos(),
            header.hash_table_entries,
        )?;
        let hash_table = HashTable::parse(hash_bytes, header.hash_table_entries as usize)?;

        let block_bytes = table_slice(
            bytes,
            "block table",
            header.block_table_pos(),
            header.block_table_entries,
        )?;
        let block_table = BlockTable::parse(block_bytes, header.block_table_entries as usize)?;

        Ok(Self {
            path: None,
            data,
            header,
            hash_table,
            block_table,
        })
    }

    /// Path the archive was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Archive header
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// Block table entries
    pub fn block_entries(&self) -> &[BlockEntry] {
        self.block_table.entries()
    }

    /// Hash table entry for a member name
    pub fn hash_entry(&self, name: &str) -> Result<&HashEntry> {
        self.hash_table
            .get(name)
            .ok_or_else(|| MpqError::FileNotFound(name.to_string()))
    }

    fn block_entry(&self, name: &str) -> Result<&BlockEntry> {
        let hash = self.hash_entry(name)?;
        self.block_table
            .get(hash.block_index)
            .filter(|block| block.exists())
            .ok_or_else(|| MpqError::BlockNotPresent {
                name: name.to_string(),
                index: hash.block_index,
            })
    }

    /// Whether the archive holds a readable member with this name
    pub fn contains(&self, name: &str) -> bool {
        self.block_entry(name).is_ok()
    }

    /// Read and decompress a member
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let block = *self.block_entry(name)?;
        if block.archive_size == 0 {
            return Ok(Vec::new());
        }

        if block.is_encrypted() {
            return Err(MpqError::EncryptionUnsupported {
                name: name.to_string(),
                key: file_key(name, block.offset, block.size, block.has_fix_key()),
            });
        }

        let bytes = self.data.as_ref();
        let start = block.offset as usize;
        let end = start + block.archive_size as usize;
        if end > bytes.len() {
            return Err(MpqError::OutOfBounds {
                what: "file body",
                offset: start as u64,
                size: u64::from(block.archive_size),
                archive_size: bytes.len() as u64,
            });
        }
        let body = &bytes[start..end];

        let size = block.size as usize;
        if block.is_single_unit() {
            // A unit is compressed only when it is stored shorter than its size
            let data = if body.len() >= size {
                body[..size].to_vec()
            } else if block.is_imploded() {
                return Err(MpqError::UnsupportedCompression(COMPRESSION_IMPLODE));
            } else if block.is_compressed() {
                decompress_sector(body, size)?
            } else {
                body.to_vec()
            };
            return check_length(name, data, size);
        }

        if !block.is_compressed() && !block.is_imploded() {
            // Uncompressed sectored bodies are stored contiguously
            let data = body[..body.len().min(size)].to_vec();
            return check_length(name, data, size);
        }

        self.read_sectors(&block, body)
    }

    fn read_sectors(&self, block: &BlockEntry, body: &[u8]) -> Result<Vec<u8>> {
        let size = block.size as usize;
        let sector_size = self.header.sector_size();
        let sector_count = size.div_ceil(sector_size);

        let table_len = (sector_count + 1) * 4;
        if body.len() < table_len {
            return Err(MpqError::CorruptArchiveData(format!(
                "sector table needs {table_len} bytes, body has {}",
                body.len()
            )));
        }
        let offsets: Vec<usize> = body[..table_len]
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]) as usize)
            .collect();

        let mut out = Vec::with_capacity(size);
        for (index, bounds) in offsets.windows(2).enumerate() {
            let (start, end) = (bounds[0], bounds[1]);
            if start > end || end > body.len() {
                return Err(MpqError::CorruptArchiveData(format!(
                    "sector {index} spans {start}..{end} in a {} byte body",
                    body.len()
                )));
            }

            let expected = sector_size.min(size - index * sector_size);
            let sector = &body[start..end];
            let decoded = if sector.len() < expected {
                if !block.is_compressed() {
                    return Err(MpqError::UnsupportedCompression(COMPRESSION_IMPLODE));
                }
                decompress_sector(sector, expected)?
            } else {
                sector.to_vec()
            };

            if decoded.len() != expected {
                return Err(MpqError::CorruptArchiveData(format!(
                    "sector {index} decoded to {} bytes, expected {expected}",
                    decoded.len()
                )));
            }
            out.extend_from_slice(&decoded);
        }

        Ok(out)
    }

    /// Names listed in the archive's `(listfile)` member
    pub fn file_list(&self) -> Result<Vec<String>> {
        let data = self.read_file(LISTFILE_NAME)?;
        Ok(String::from_utf8_lossy(&data)
            .split(['\r', '\n', ';'])
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn check_length(name: &str, data: Vec<u8>, size: usize) -> Result<Vec<u8>> {
    if data.len() == size {
        Ok(data)
    } else {
        Err(MpqError::CorruptArchiveData(format!(
            "{name} decoded to {} bytes, block declares {size}",
            data.len()
        )))
    }
}

fn table_slice<'a>(
    bytes: &'a [u8],
    what: &'static str,
    offset: u64,
    entries: u32,
) -> Result<&'a [u8]> {
    let size = u64::from(entries) * TABLE_ENTRY_SIZE as u64;
    let end = offset + size;
    if end > bytes.len() as u64 {
        return Err(MpqError::OutOfBounds {
            what,
            offset,
            size,
            archive_size: bytes.len() as u64,
        });
    }
    Ok(&bytes[offset as usize..end as usize])
}
