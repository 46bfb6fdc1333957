//! Root table parsing and locale-aware lookup
//!
//! The root table maps FileDataIDs to content keys. Records are grouped into
//! blocks that share content and locale flags; a FileDataID may appear in
//! several blocks, one per locale or content variant. Lookups pick the first
//! block that matches the requested locale and is not a low-violence variant.

mod error;
mod file;
mod flags;

pub use error::{Result, RootError};
pub use file::{
    EXTENDED_HEADER_THRESHOLD, ROOT_MAGIC, RootFile, RootFormat, RootType, decode_file_data_ids,
    encode_file_data_ids,
};
pub use flags::{ContentFlags, LocaleFlags};
