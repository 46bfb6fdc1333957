//! Encoding table parsing
//!
//! The encoding table maps content keys (hash of the decoded file) to
//! encoding keys (hash of the stored BLTE frame) and decoded sizes.

mod error;
mod file;
mod header;

pub use error::{EncodingError, Result};
pub use file::{EncodingEntry, EncodingFile};
pub use header::{ENCODING_MAGIC, EncodingHeader, HEADER_SIZE};
