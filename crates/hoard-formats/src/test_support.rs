//! Builders that assemble small archives and tables in memory
//!
//! Every builder writes the same layout the parsers in this crate read, so
//! tests here and in dependent crates can exercise real byte streams without
//! game data on disk.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use hoard_crypto::storm::{encrypt_bytes, hash_string};
use hoard_crypto::salsa20::encrypt_salsa20;
use hoard_crypto::{Arc4Cipher, ContentKey, EncodingKey, FileDataId, HashType};
use md5::{Digest, Md5};

use crate::encoding::HEADER_SIZE as ENCODING_HEADER_SIZE;
use crate::mpq::{BlockFlags, HEADER_SIZE_V0, HEADER_SIZE_V1, MPQ_MAGIC, table_key};
use crate::root::{EXTENDED_HEADER_THRESHOLD, ROOT_MAGIC, encode_file_data_ids};

/// zlib-compress a buffer
pub fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("zlib write");
    encoder.finish().expect("zlib finish")
}

/// `Z` chunk holding `data`
pub fn zlib_chunk(data: &[u8]) -> Vec<u8> {
    let mut chunk = vec![b'Z'];
    chunk.extend(zlib_compress(data));
    chunk
}

/// `E` chunk wrapping an already-built inner chunk
///
/// `cipher` is `b'S'` for Salsa20 or `b'A'` for ARC4.
pub fn encrypted_chunk(
    inner: &[u8],
    key_name: u64,
    key: &[u8; 16],
    iv: &[u8],
    cipher: u8,
    chunk_index: usize,
) -> Vec<u8> {
    let ciphertext = match cipher {
        b'A' => Arc4Cipher::new(key).expect("arc4 key").decrypt(inner),
        _ => encrypt_salsa20(inner, key, iv, chunk_index).expect("salsa20"),
    };

    let mut chunk = vec![b'E', 8];
    chunk.extend_from_slice(&key_name.to_le_bytes());
    chunk.push(iv.len() as u8);
    chunk.extend_from_slice(iv);
    chunk.push(cipher);
    chunk.extend(ciphertext);
    chunk
}

/// Multi-chunk BLTE frame builder
#[derive(Debug, Default)]
pub struct BlteBuilder {
    extended: bool,
    chunks: Vec<(Vec<u8>, u32)>,
}

impl BlteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use 40-byte chunk table entries
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    pub fn raw(self, data: &[u8]) -> Self {
        let mut stored = vec![b'N'];
        stored.extend_from_slice(data);
        self.chunk(stored, data.len() as u32)
    }

    pub fn zlib(self, data: &[u8]) -> Self {
        self.chunk(zlib_chunk(data), data.len() as u32)
    }

    /// Append a stored chunk with an explicit declared decoded size
    pub fn chunk(mut self, stored: Vec<u8>, decompressed_size: u32) -> Self {
        self.chunks.push((stored, decompressed_size));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let (flags, info_size) = if self.extended { (0x10u8, 40) } else { (0x0Fu8, 24) };
        let header_size = 8 + 4 + self.chunks.len() * info_size;

        let mut out = b"BLTE".to_vec();
        out.extend_from_slice(&(header_size as u32).to_be_bytes());
        out.push(flags);
        out.extend_from_slice(&(self.chunks.len() as u32).to_be_bytes()[1..]);

        for (stored, decompressed_size) in &self.chunks {
            out.extend_from_slice(&(stored.len() as u32).to_be_bytes());
            out.extend_from_slice(&decompressed_size.to_be_bytes());
            out.extend_from_slice(&Md5::digest(stored));
            if self.extended {
                out.extend_from_slice(&[0u8; 16]);
            }
        }
        for (stored, _) in &self.chunks {
            out.extend_from_slice(stored);
        }
        out
    }
}

/// One block of root records
#[derive(Debug, Clone)]
pub struct RootBlockSpec {
    content_flags: u32,
    locale_flags: u32,
    records: Vec<(u32, ContentKey)>,
}

impl RootBlockSpec {
    /// Records must be in ascending ID order
    pub fn new(content_flags: u32, locale_flags: u32, records: &[(u32, ContentKey)]) -> Self {
        Self {
            content_flags,
            locale_flags,
            records: records.to_vec(),
        }
    }

    fn write_prefix(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.content_flags.to_le_bytes());
        out.extend_from_slice(&self.locale_flags.to_le_bytes());

        let ids: Vec<FileDataId> = self
            .records
            .iter()
            .map(|&(id, _)| FileDataId::new(id))
            .collect();
        for delta in encode_file_data_ids(&ids) {
            out.extend_from_slice(&delta.to_le_bytes());
        }
    }

    fn name_hash(id: u32) -> [u8; 8] {
        (u64::from(id) * 0x9E37_79B9).to_le_bytes()
    }
}

/// `MFST` root table
///
/// Blocks flagged `NO_NAME_HASH` omit their hashes when `total != named`,
/// matching the parser. Counts below the extended-header threshold are
/// written behind a header size and version pair, since a plain header with
/// such counts would be read as the extended form.
pub fn build_manifest_root(total: u32, named: u32, blocks: &[RootBlockSpec]) -> Vec<u8> {
    let mut out = ROOT_MAGIC.to_le_bytes().to_vec();
    if total < EXTENDED_HEADER_THRESHOLD {
        out.extend_from_slice(&24u32.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
    }
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(&named.to_le_bytes());
    if total < EXTENDED_HEADER_THRESHOLD {
        out.extend_from_slice(&0u32.to_le_bytes());
    }

    let allow_nameless = total != named;
    for block in blocks {
        block.write_prefix(&mut out);
        for (_, ckey) in &block.records {
            out.extend_from_slice(ckey.as_bytes());
        }
        let nameless = allow_nameless && block.content_flags & 0x1000_0000 != 0;
        if !nameless {
            for &(id, _) in &block.records {
                out.extend_from_slice(&RootBlockSpec::name_hash(id));
            }
        }
    }
    out
}

/// Magic-less root table with interleaved key and hash records
pub fn build_classic_root(blocks: &[RootBlockSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    for block in blocks {
        block.write_prefix(&mut out);
        for &(id, ckey) in &block.records {
            out.extend_from_slice(ckey.as_bytes());
            out.extend_from_slice(&RootBlockSpec::name_hash(id));
        }
    }
    out
}

/// One content key page record
#[derive(Debug, Clone)]
pub struct EncodingRecord {
    ckey: ContentKey,
    size: u64,
    ekeys: Vec<EncodingKey>,
}

impl EncodingRecord {
    pub fn new(ckey: ContentKey, size: u64, ekeys: &[EncodingKey]) -> Self {
        Self {
            ckey,
            size,
            ekeys: ekeys.to_vec(),
        }
    }
}

const ENCODING_PAGE_KB: u16 = 4;

/// Encoding table with one 4 KiB content key page per entry of `pages`
///
/// Pages are zero padded and no encoding key pages are written.
pub fn build_encoding(pages: &[Vec<EncodingRecord>], espec: &[u8]) -> Vec<u8> {
    let page_size = usize::from(ENCODING_PAGE_KB) * 1024;

    let mut out = Vec::with_capacity(ENCODING_HEADER_SIZE + pages.len() * page_size);
    out.extend_from_slice(b"EN");
    out.push(1); // version
    out.push(16); // ckey size
    out.push(16); // ekey size
    out.extend_from_slice(&ENCODING_PAGE_KB.to_be_bytes());
    out.extend_from_slice(&ENCODING_PAGE_KB.to_be_bytes());
    out.extend_from_slice(&(pages.len() as u32).to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.push(0); // flags
    out.extend_from_slice(&(espec.len() as u32).to_be_bytes());
    out.extend_from_slice(espec);

    let encoded: Vec<Vec<u8>> = pages
        .iter()
        .map(|records| {
            let mut page = Vec::with_capacity(page_size);
            for record in records {
                page.push(record.ekeys.len() as u8);
                page.extend_from_slice(&record.size.to_be_bytes()[3..]);
                page.extend_from_slice(record.ckey.as_bytes());
                for ekey in &record.ekeys {
                    page.extend_from_slice(ekey.as_bytes());
                }
            }
            assert!(page.len() <= page_size, "records overflow the page");
            page.resize(page_size, 0);
            page
        })
        .collect();

    // Page index: first key and MD5 of each page
    for (records, page) in pages.iter().zip(&encoded) {
        let first = records.first().map_or([0u8; 16], |r| *r.ckey.as_bytes());
        out.extend_from_slice(&first);
        out.extend_from_slice(&Md5::digest(page));
    }
    for page in encoded {
        out.extend(page);
    }
    out
}

/// How [`MpqBuilder::file`] stores a member
#[derive(Debug, Clone, Copy, Default)]
pub struct MpqFileOptions {
    compress: bool,
    single_unit: bool,
}

impl MpqFileOptions {
    /// zlib-compressed 512-byte sectors
    pub fn compressed() -> Self {
        Self {
            compress: true,
            single_unit: false,
        }
    }

    /// One zlib-compressed unit
    pub fn single_unit() -> Self {
        Self {
            compress: true,
            single_unit: true,
        }
    }

    /// One unit stored as-is
    pub fn single_unit_stored() -> Self {
        Self {
            compress: false,
            single_unit: true,
        }
    }
}

#[derive(Debug)]
struct MpqMember {
    name: String,
    body: Vec<u8>,
    size: u32,
    flags: u32,
}

/// In-memory MPQ archive builder
#[derive(Debug, Default)]
pub struct MpqBuilder {
    format_version: u16,
    members: Vec<MpqMember>,
}

impl MpqBuilder {
    const SECTOR_SIZE: usize = 512;

    pub fn new() -> Self {
        Self::default()
    }

    /// `0` writes a 0x20-byte header, `1` a 0x2C-byte one
    pub fn format_version(mut self, version: u16) -> Self {
        self.format_version = version;
        self
    }

    /// Add a member, encoding its body the way `options` asks
    pub fn file(self, name: &str, content: &[u8], options: MpqFileOptions) -> Self {
        let mut flags = BlockFlags::EXISTS;
        let body = if content.is_empty() {
            Vec::new()
        } else if options.single_unit {
            flags |= BlockFlags::SINGLE_UNIT;
            if options.compress {
                flags |= BlockFlags::COMPRESS;
                compress_or_store(content)
            } else {
                content.to_vec()
            }
        } else if options.compress {
            flags |= BlockFlags::COMPRESS;
            sectored_body(content, Self::SECTOR_SIZE)
        } else {
            content.to_vec()
        };
        self.raw_block(name, body, content.len() as u32, flags)
    }

    /// Add a member with a hand-built body and block flags
    pub fn raw_block(mut self, name: &str, body: Vec<u8>, size: u32, flags: u32) -> Self {
        self.members.push(MpqMember {
            name: name.to_string(),
            body,
            size,
            flags,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let header_size = if self.format_version >= 1 {
            HEADER_SIZE_V1
        } else {
            HEADER_SIZE_V0
        };

        let mut out = vec![0u8; header_size];
        let mut blocks = Vec::with_capacity(self.members.len() * 16);
        for member in &self.members {
            let offset = out.len() as u32;
            out.extend_from_slice(&member.body);
            for word in [offset, member.body.len() as u32, member.size, member.flags] {
                blocks.extend_from_slice(&word.to_le_bytes());
            }
        }

        let slots = (self.members.len() * 2).max(4).next_power_of_two();
        let mut hash_slots = vec![[0xFFu8; 16]; slots];
        for (index, member) in self.members.iter().enumerate() {
            let mut slot = hash_string(&member.name, HashType::TableOffset) as usize & (slots - 1);
            while hash_slots[slot][12..] != [0xFF; 4] {
                slot = (slot + 1) & (slots - 1);
            }
            let mut entry = [0u8; 16];
            entry[..4].copy_from_slice(&hash_string(&member.name, HashType::HashA).to_le_bytes());
            entry[4..8].copy_from_slice(&hash_string(&member.name, HashType::HashB).to_le_bytes());
            entry[12..].copy_from_slice(&(index as u32).to_le_bytes());
            hash_slots[slot] = entry;
        }
        let hash_table: Vec<u8> = hash_slots.concat();

        let hash_table_offset = out.len() as u32;
        out.extend(encrypt_bytes(&hash_table, table_key("(hash table)")));
        let block_table_offset = out.len() as u32;
        out.extend(encrypt_bytes(&blocks, table_key("(block table)")));

        let mut header = MPQ_MAGIC.to_vec();
        header.extend_from_slice(&(header_size as u32).to_le_bytes());
        header.extend_from_slice(&(out.len() as u32).to_le_bytes());
        header.extend_from_slice(&self.format_version.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // sector shift
        header.extend_from_slice(&hash_table_offset.to_le_bytes());
        header.extend_from_slice(&block_table_offset.to_le_bytes());
        header.extend_from_slice(&(slots as u32).to_le_bytes());
        header.extend_from_slice(&(self.members.len() as u32).to_le_bytes());
        // Version 1 extension fields stay zero
        out[..header.len()].copy_from_slice(&header);
        out
    }
}

// Type byte plus zlib stream, or the raw bytes when that does not shrink them
fn compress_or_store(data: &[u8]) -> Vec<u8> {
    let mut compressed = vec![0x02];
    compressed.extend(zlib_compress(data));
    if compressed.len() < data.len() {
        compressed
    } else {
        data.to_vec()
    }
}

fn sectored_body(content: &[u8], sector_size: usize) -> Vec<u8> {
    let sectors: Vec<Vec<u8>> = content.chunks(sector_size).map(compress_or_store).collect();

    let table_len = (sectors.len() + 1) * 4;
    let mut offsets = Vec::with_capacity(sectors.len() + 1);
    let mut position = table_len;
    offsets.push(position as u32);
    for sector in &sectors {
        position += sector.len();
        offsets.push(position as u32);
    }

    let mut body = Vec::with_capacity(position);
    for offset in offsets {
        body.extend_from_slice(&offset.to_le_bytes());
    }
    for sector in sectors {
        body.extend(sector);
    }
    body
}
