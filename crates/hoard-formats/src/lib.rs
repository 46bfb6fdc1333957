//! Parsers for the binary formats behind CASC and MPQ game archives
//!
//! # Supported Formats
//!
//! - **BLTE**: chunked container for raw, zlib-compressed and encrypted content
//! - **Root**: FileDataID to content key table, filtered by locale and content flags
//! - **Encoding**: content key to encoding key table
//! - **MPQ**: legacy archives with encrypted hash and block tables
//! - **Listfile**: `<id>;<path>` manifests naming FileDataIDs
//! - **Config**: build configuration (`key = value` text)
//!
//! Everything here is read-only. Tables are parsed once into immutable
//! structures that can be shared across threads.

#![warn(missing_docs)]
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns

pub mod blte;
pub mod config;
pub mod encoding;
pub mod listfile;
pub mod mpq;
pub mod root;

/// Fixture builders for tests in this and downstream crates
#[cfg(any(test, feature = "test-support"))]
#[allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
pub mod test_support;
