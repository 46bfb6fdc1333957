//! Encoding table: content key to encoding key and size

use std::collections::HashMap;

use binrw::BinRead;
use binrw::io::Cursor;
use hoard_crypto::{ContentKey, EncodingKey};

use super::error::{EncodingError, Result};
use super::header::EncodingHeader;

/// One content key page record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingEntry {
    /// First encoding key listed for the content
    pub encoding_key: EncodingKey,
    /// Decoded file size (40-bit)
    pub size: u64,
}

/// Parsed encoding table, immutable once built
#[derive(Debug, Clone)]
pub struct EncodingFile {
    header: EncodingHeader,
    entries: HashMap<ContentKey, EncodingEntry>,
}

impl EncodingFile {
    /// Parse a decoded encoding table
    ///
    /// Only the content key pages are read; the encoding key pages that follow
    /// them are not needed to resolve content keys.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = EncodingHeader::read(&mut Cursor::new(data))?;
        header.validate()?;

        let page_size = header.ckey_page_size();
        let pages_offset = header.ckey_pages_offset();
        let mut entries = HashMap::new();

        for page in 0..header.ckey_page_count {
            let start = pages_offset + page as usize * page_size;
            let end = start + page_size;
            if end > data.len() {
                return Err(EncodingError::Truncated {
                    page,
                    needed: end,
                    available: data.len(),
                });
            }
            read_page(&data[start..end], page, &mut entries)?;
        }

        Ok(Self { header, entries })
    }

    /// Header of the table
    pub fn header(&self) -> &EncodingHeader {
        &self.header
    }

    /// Encoding key for a content key
    pub fn encoding_key(&self, ckey: &ContentKey) -> Option<EncodingKey> {
        self.entries.get(ckey).map(|entry| entry.encoding_key)
    }

    /// Decoded size for a content key
    pub fn size(&self, ckey: &ContentKey) -> Option<u64> {
        self.entries.get(ckey).map(|entry| entry.size)
    }

    /// Full record for a content key
    pub fn entry(&self, ckey: &ContentKey) -> Option<&EncodingEntry> {
        self.entries.get(ckey)
    }

    /// Number of content keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Record: key_count u8 (0 ends the page), size u40 BE, ckey, key_count ekeys
fn read_page(
    page_data: &[u8],
    page: u32,
    entries: &mut HashMap<ContentKey, EncodingEntry>,
) -> Result<()> {
    let mut pos = 0;
    while pos < page_data.len() {
        let key_count = usize::from(page_data[pos]);
        if key_count == 0 {
            break;
        }

        let record_size = 1 + 5 + 16 + 16 * key_count;
        if pos + record_size > page_data.len() {
            return Err(EncodingError::Truncated {
                page,
                needed: pos + record_size,
                available: page_data.len(),
            });
        }

        let record = &page_data[pos..pos + record_size];
        let size = record[1..6]
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
        let ckey = ContentKey::from_slice(&record[6..22]);
        let ekey = EncodingKey::from_slice(&record[22..38]);
        if let (Some(ckey), Some(encoding_key)) = (ckey, ekey) {
            entries.insert(ckey, EncodingEntry { encoding_key, size });
        }

        pos += record_size;
    }
    Ok(())
}
