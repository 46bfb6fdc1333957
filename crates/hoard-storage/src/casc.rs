//! CASC source
//!
//! Opening a build is one sequential pipeline: fetch and decode the encoding
//! table, resolve the root table's encoding key through it, then fetch and
//! decode the root table. Any failure aborts the open. After that the tables
//! are immutable and every read runs independently:
//!
//! ```text
//! FileDataID ─root─> ContentKey ─encoding─> EncodingKey ─store─> BLTE ─> bytes
//! ```

use std::sync::Arc;

use hoard_crypto::{ContentKey, EncodingKey, FileDataId};
use hoard_formats::blte::{self, BlteFile, PartialDecode};
use hoard_formats::config::BuildConfig;
use hoard_formats::encoding::EncodingFile;
use hoard_formats::root::{LocaleFlags, RootFile};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::keyring::KeyRing;
use crate::listfile::{ListfileIndex, ListfileLoader, UNKNOWN_PREFIX, UnknownCounts, UnknownSources};
use crate::store::ContentStore;
use crate::{Result, StorageError};

/// An opened CASC build
#[derive(Debug, Clone)]
pub struct CascSource {
    store: Arc<dyn ContentStore>,
    keys: KeyRing,
    listfile: Arc<ListfileIndex>,
    encoding: Arc<EncodingFile>,
    root: Arc<RootFile>,
    locale: LocaleFlags,
    build_name: String,
    enable_unknown_files: bool,
}

impl CascSource {
    /// Load the encoding and root tables of the build described by `build_config`
    pub async fn open(
        store: Arc<dyn ContentStore>,
        build_config: &BuildConfig,
        keys: KeyRing,
        listfile: Arc<ListfileIndex>,
        config: &StorageConfig,
    ) -> Result<Self> {
        let locale = LocaleFlags::from_locale_code(&config.locale).unwrap_or_else(|| {
            warn!("Invalid locale {}, defaulting to enUS", config.locale);
            LocaleFlags::new(LocaleFlags::ENUS)
        });

        let encoding_ref = build_config.encoding()?;
        info!("Loading encoding table {}", encoding_ref.encoding_key);
        let raw = store.fetch(&encoding_ref.encoding_key).await?;
        let encoding = EncodingFile::parse(&blte::decode(&raw, &keys)?)?;
        debug!("encoding table: {} content keys", encoding.len());

        let root_ckey = build_config.root()?;
        let root_ekey = encoding.encoding_key(&root_ckey).ok_or_else(|| {
            StorageError::MissingIndexEntry(format!("No encoding entry found: {root_ckey}"))
        })?;
        info!("Loading root table {}", root_ekey);
        let raw = store.fetch(&root_ekey).await?;
        let root = RootFile::parse(&blte::decode(&raw, &keys)?)?;
        debug!(
            "root table: {} FileDataIDs in {} root types",
            root.len(),
            root.root_types().len()
        );

        let build_name = config
            .build_name
            .clone()
            .or_else(|| build_config.build_name().map(String::from))
            .unwrap_or_else(|| "unknown".to_string());

        info!(
            "Opened CASC build {} ({} files, locale {})",
            build_name,
            root.len(),
            locale.locale_code().unwrap_or("custom")
        );

        Ok(Self {
            store,
            keys,
            listfile,
            encoding: Arc::new(encoding),
            root: Arc::new(root),
            locale,
            build_name,
            enable_unknown_files: config.enable_unknown_files,
        })
    }

    /// Install the listfile, keeping only FileDataIDs present in root
    ///
    /// An empty result is an error: nothing could be named.
    pub async fn load_listfile(&self, loader: &ListfileLoader) -> Result<usize> {
        let root = Arc::clone(&self.root);
        let keep = move |id: u32| root.contains(FileDataId::new(id));
        let count = loader.load_into(&self.listfile, Some(&keep)).await?;
        if count == 0 {
            return Err(StorageError::MissingIndexEntry(
                "No listfile entries found".to_string(),
            ));
        }
        Ok(count)
    }

    /// Name unlisted textures, models and sound kit files
    ///
    /// Does nothing when unknown files are disabled in the configuration.
    pub fn load_unknowns(&self, sources: &UnknownSources) -> UnknownCounts {
        if !self.enable_unknown_files {
            debug!("unknown files disabled, skipping");
            return UnknownCounts::default();
        }
        self.listfile.load_unknowns(sources)
    }

    /// Encoding key of a FileDataID for the selected locale
    pub fn encoding_key_for(&self, file_data_id: u32) -> Result<EncodingKey> {
        let content_key = self
            .root
            .content_key(FileDataId::new(file_data_id), self.locale)?;
        self.get_encoding_key_for_content_key(&content_key)
    }

    /// Encoding key for a content key
    pub fn get_encoding_key_for_content_key(
        &self,
        content_key: &ContentKey,
    ) -> Result<EncodingKey> {
        self.encoding.encoding_key(content_key).ok_or_else(|| {
            StorageError::MissingIndexEntry(format!("No encoding entry found: {content_key}"))
        })
    }

    /// Decoded contents of a FileDataID
    pub async fn get_file(&self, file_data_id: u32) -> Result<Vec<u8>> {
        let encoding_key = self.encoding_key_for(file_data_id)?;
        let raw = self.store.fetch(&encoding_key).await?;
        Ok(blte::decode(&raw, &self.keys)?)
    }

    /// Decoded contents with chunks under missing keys zero-filled
    pub async fn get_file_partial(&self, file_data_id: u32) -> Result<PartialDecode> {
        let encoding_key = self.encoding_key_for(file_data_id)?;
        let raw = self.store.fetch(&encoding_key).await?;
        let decoded = BlteFile::parse(&raw)?.decode_partial(&self.keys)?;
        if !decoded.is_complete() {
            warn!(
                "FileDataID {} decoded with {} missing keys",
                file_data_id,
                decoded.missing_keys.len()
            );
        }
        Ok(decoded)
    }

    /// Decoded contents of a named file
    ///
    /// `unknown/<id>` names without an extension resolve directly to `<id>`.
    pub async fn get_file_by_name(&self, name: &str) -> Result<Vec<u8>> {
        let file_data_id = self.resolve_name(name)?;
        self.get_file(file_data_id).await
    }

    /// FileDataID for a name
    pub fn resolve_name(&self, name: &str) -> Result<u32> {
        if let Some(rest) = name.strip_prefix(UNKNOWN_PREFIX) {
            if !rest.contains('.') {
                return rest.parse().map_err(|_| {
                    StorageError::MissingIndexEntry(format!("invalid unknown file name: {name}"))
                });
            }
        }

        self.listfile.get_by_filename(name).ok_or_else(|| {
            StorageError::MissingIndexEntry(format!("File not mapping in listfile: {name}"))
        })
    }

    /// FileDataIDs with a root entry for the selected locale
    pub fn valid_root_entries(&self) -> Vec<u32> {
        self.root
            .valid_file_data_ids(self.locale)
            .into_iter()
            .map(FileDataId::get)
            .collect()
    }

    /// Build name
    pub fn build_name(&self) -> &str {
        &self.build_name
    }

    /// Selected locale
    pub fn locale(&self) -> LocaleFlags {
        self.locale
    }

    /// Listfile shared with this source
    pub fn listfile(&self) -> &Arc<ListfileIndex> {
        &self.listfile
    }

    /// Key ring used for encrypted chunks
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Root table
    pub fn root(&self) -> &RootFile {
        &self.root
    }

    /// Encoding table
    pub fn encoding(&self) -> &EncodingFile {
        &self.encoding
    }
}
