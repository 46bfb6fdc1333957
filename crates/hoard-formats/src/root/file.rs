//! Root table: FileDataID to content key, filtered by locale

use std::collections::HashMap;

use binrw::{BinRead, BinResult};
use binrw::io::{Cursor, Seek, SeekFrom};
use hoard_crypto::{ContentKey, FileDataId};

use super::error::{Result, RootError};
use super::flags::{ContentFlags, LocaleFlags};

/// `MFST` read as a little-endian u32
pub const ROOT_MAGIC: u32 = 0x4D46_5354;

/// Header counts below this mean the header carries an extra size/version pair
///
/// Provisional: newer clients prefix the counts with a header size and
/// version, both of which are small numbers.
pub const EXTENDED_HEADER_THRESHOLD: u32 = 100;

const BLOCK_HEADER_SIZE: u64 = 12;
const NAME_HASH_SIZE: u64 = 8;

/// Layout the table was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFormat {
    /// No magic; content key and name hash interleaved per record
    Classic,
    /// `MFST` header; keys then name hashes per block
    Manifest,
}

/// Flags shared by one block of records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootType {
    /// Content flags of the block
    pub content_flags: ContentFlags,
    /// Locales the block applies to
    pub locale_flags: LocaleFlags,
}

impl RootType {
    /// Whether lookups for `locale` may select this type
    pub const fn is_selectable(&self, locale: LocaleFlags) -> bool {
        self.locale_flags.matches(locale) && !self.content_flags.has(ContentFlags::LOW_VIOLENCE)
    }
}

/// Parsed root table, immutable once built
#[derive(Debug, Clone)]
pub struct RootFile {
    format: RootFormat,
    root_types: Vec<RootType>,
    // Type indices are ascending within each list
    entries: HashMap<FileDataId, Vec<(u32, ContentKey)>>,
}

impl RootFile {
    /// Parse a decoded root table
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        let len = data.len() as u64;

        let magic = if len >= 4 { u32::read_le(&mut reader)? } else { 0 };
        let (format, allow_nameless) = if magic == ROOT_MAGIC {
            let (total, named) = read_counts(&mut reader)?;
            (RootFormat::Manifest, total != named)
        } else {
            reader.seek(SeekFrom::Start(0))?;
            (RootFormat::Classic, false)
        };

        let mut root = Self {
            format,
            root_types: Vec::new(),
            entries: HashMap::new(),
        };

        while reader.position() < len {
            root.read_block(&mut reader, len, allow_nameless)?;
        }

        Ok(root)
    }

    fn read_block(
        &mut self,
        reader: &mut Cursor<&[u8]>,
        len: u64,
        allow_nameless: bool,
    ) -> Result<()> {
        let start = reader.position();
        if len - start < BLOCK_HEADER_SIZE {
            return Err(RootError::TruncatedBlock(start));
        }

        let record_count = u32::read_le(reader)?;
        let content_flags = ContentFlags::new(u32::read_le(reader)?);
        let locale_flags = LocaleFlags::new(u32::read_le(reader)?);

        let has_name_hashes = match self.format {
            RootFormat::Classic => true,
            RootFormat::Manifest => {
                !(allow_nameless && content_flags.has(ContentFlags::NO_NAME_HASH))
            }
        };
        let per_record = 4 + 16 + if has_name_hashes { NAME_HASH_SIZE } else { 0 };
        if u64::from(record_count) * per_record > len - reader.position() {
            return Err(RootError::TruncatedBlock(start));
        }

        let deltas = (0..record_count)
            .map(|_| i32::read_le(reader))
            .collect::<BinResult<Vec<_>>>()?;
        let ids = decode_file_data_ids(&deltas).ok_or(RootError::InvalidDelta(start))?;

        let type_index = self.root_types.len() as u32;
        match self.format {
            RootFormat::Manifest => {
                for &id in &ids {
                    let key = ContentKey::read_le(reader)?;
                    self.insert(id, type_index, key);
                }
                if has_name_hashes {
                    let skip = NAME_HASH_SIZE * u64::from(record_count);
                    reader.seek(SeekFrom::Current(skip as i64))?;
                }
            }
            RootFormat::Classic => {
                for &id in &ids {
                    let key = ContentKey::read_le(reader)?;
                    reader.seek(SeekFrom::Current(NAME_HASH_SIZE as i64))?;
                    self.insert(id, type_index, key);
                }
            }
        }

        // Pushed last so records above refer to this block by its index
        self.root_types.push(RootType {
            content_flags,
            locale_flags,
        });
        Ok(())
    }

    fn insert(&mut self, id: FileDataId, type_index: u32, key: ContentKey) {
        let list = self.entries.entry(id).or_default();
        match list.last_mut() {
            Some((index, existing)) if *index == type_index => *existing = key,
            _ => list.push((type_index, key)),
        }
    }

    /// Layout the table was parsed from
    pub fn format(&self) -> RootFormat {
        self.format
    }

    /// Number of distinct FileDataIDs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All root types in block order
    pub fn root_types(&self) -> &[RootType] {
        &self.root_types
    }

    /// Whether the FileDataID appears in any block
    pub fn contains(&self, id: FileDataId) -> bool {
        self.entries.contains_key(&id)
    }

    /// `(root type index, content key)` pairs for a FileDataID
    pub fn entries_for(&self, id: FileDataId) -> Option<&[(u32, ContentKey)]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    /// Content key of the first root type that matches `locale` and is not
    /// low-violence
    pub fn content_key(&self, id: FileDataId, locale: LocaleFlags) -> Result<ContentKey> {
        let entries = self.entries.get(&id).ok_or(RootError::FileNotFound(id))?;
        entries
            .iter()
            .find(|(index, _)| self.is_selectable(*index, locale))
            .map(|&(_, key)| key)
            .ok_or(RootError::NoLocaleMatch {
                file_data_id: id,
                locale: locale.value(),
            })
    }

    /// FileDataIDs with at least one selectable entry for `locale`, ascending
    pub fn valid_file_data_ids(&self, locale: LocaleFlags) -> Vec<FileDataId> {
        let mut ids: Vec<FileDataId> = self
            .entries
            .iter()
            .filter(|(_, list)| list.iter().any(|(index, _)| self.is_selectable(*index, locale)))
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Every FileDataID in the table, ascending
    pub fn file_data_ids(&self) -> Vec<FileDataId> {
        let mut ids: Vec<FileDataId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn is_selectable(&self, index: u32, locale: LocaleFlags) -> bool {
        self.root_types
            .get(index as usize)
            .is_some_and(|root_type| root_type.is_selectable(locale))
    }
}

fn read_counts(reader: &mut Cursor<&[u8]>) -> Result<(u32, u32)> {
    let mut total = u32::read_le(reader)?;
    let mut named = u32::read_le(reader)?;

    if total < EXTENDED_HEADER_THRESHOLD {
        // The two values just read were header size and version
        total = u32::read_le(reader)?;
        named = u32::read_le(reader)?;
        u32::read_le(reader)?;
    }

    if named > total {
        return Err(RootError::InvalidHeader(format!(
            "named file count {named} exceeds total {total}"
        )));
    }

    Ok((total, named))
}

/// Decode a delta-encoded FileDataID run
///
/// Each delta is relative to one past the previous ID; the run starts at 0.
/// Returns `None` if an ID falls outside the u32 range.
pub fn decode_file_data_ids(deltas: &[i32]) -> Option<Vec<FileDataId>> {
    let mut ids = Vec::with_capacity(deltas.len());
    let mut next: i64 = 0;
    for &delta in deltas {
        let id = u32::try_from(next + i64::from(delta)).ok()?;
        ids.push(FileDataId::new(id));
        next = i64::from(id) + 1;
    }
    Some(ids)
}

/// Encode FileDataIDs as deltas; inverse of [`decode_file_data_ids`]
pub fn encode_file_data_ids(ids: &[FileDataId]) -> Vec<i32> {
    let mut deltas = Vec::with_capacity(ids.len());
    let mut next: i64 = 0;
    for id in ids {
        let id = i64::from(id.get());
        deltas.push((id - next) as i32);
        next = id + 1;
    }
    deltas
}
