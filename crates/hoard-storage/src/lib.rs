//! Read game files from CASC builds and MPQ installations
//!
//! Both backends sit behind [`ArchiveSource`], which answers the same
//! questions for either: the bytes of a FileDataID, the bytes of a named
//! file, and the build name.
//!
//! - **CASC**: [`CascSource`] loads the encoding and root tables of one build
//!   from a [`ContentStore`] (a loose directory or CDN hosts) and decodes BLTE
//!   frames with a [`KeyRing`]
//! - **MPQ**: [`MpqSource`] opens every archive of an installation in client
//!   load order and assigns sequential FileDataIDs to the listed paths
//! - **Listfile**: [`ListfileIndex`] maps FileDataIDs to paths and is shared
//!   by whichever backend is open
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hoard_formats::config::BuildConfig;
//! use hoard_storage::{
//!     ArchiveSource, CascSource, KeyRing, ListfileIndex, LooseFileStore, StorageConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorageConfig::default();
//! let build_config = BuildConfig::parse(&std::fs::read_to_string("build-config")?);
//! let store = Arc::new(LooseFileStore::new("/data/tpr/wow/data"));
//!
//! let casc = CascSource::open(
//!     store,
//!     &build_config,
//!     KeyRing::in_memory(),
//!     Arc::new(ListfileIndex::new()),
//!     &config,
//! )
//! .await?;
//!
//! let source = ArchiveSource::from(casc);
//! let bytes = source.get_file(1_375_801).await?;
//! println!("{} bytes from {}", bytes.len(), source.build_name());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

pub mod casc;
pub mod config;
pub mod error;
pub mod keyring;
pub mod listfile;
pub mod mpq;
pub mod source;
pub mod store;

pub use casc::CascSource;
pub use config::StorageConfig;
pub use error::{ErrorKind, Result, StorageError};
pub use keyring::KeyRing;
pub use listfile::{ListfileIndex, ListfileLoader};
pub use mpq::MpqSource;
pub use source::ArchiveSource;
pub use store::{CdnStore, ContentStore, LooseFileStore};
