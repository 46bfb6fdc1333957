//! MPQ installation source
//!
//! An installation is a set of archives under `Data/` and `Data/<locale>/`.
//! Later archives override earlier ones, so the load order matters: base
//! archives before `patch*` archives, and within each group the unlocalized
//! directory before the locale directory. Every listed path is given a
//! sequential FileDataID so MPQ content can be addressed the same way as
//! CASC content.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hoard_formats::mpq::{MpqArchive, MpqError};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_LOCALE, StorageConfig};
use crate::listfile::{ListfileIndex, normalize_filename};
use crate::{Result, StorageError};

/// Data directory below the installation root
pub const DATA_DIR: &str = "Data";

/// Client configuration holding the locale
pub const CONFIG_WTF: &str = "wtf/config.wtf";

#[derive(Debug, Clone)]
struct FileLocation {
    file_path: String,
    archive: usize,
}

/// An opened MPQ installation
#[derive(Debug, Clone)]
pub struct MpqSource {
    install_dir: PathBuf,
    locale: String,
    archive_paths: Vec<PathBuf>,
    archives: Vec<Arc<MpqArchive>>,
    // Index is FileDataID - 1
    files: Vec<FileLocation>,
    by_name: HashMap<String, usize>,
    listfile: Arc<ListfileIndex>,
    build_name: String,
}

impl MpqSource {
    /// Open every archive of the installation and publish its file list
    pub async fn open(
        install_dir: impl AsRef<Path>,
        listfile: Arc<ListfileIndex>,
        config: &StorageConfig,
    ) -> Result<Self> {
        let install_dir = install_dir.as_ref().to_path_buf();
        info!("Initializing MPQ installation: {}", install_dir.display());

        let locale = read_locale(&install_dir).await;
        let archive_paths = archive_load_order(&install_dir.join(DATA_DIR), &locale).await?;
        debug!("MPQ load order: {:?}", archive_paths);

        let mut archives = Vec::with_capacity(archive_paths.len());
        let mut files: Vec<FileLocation> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for (index, path) in archive_paths.iter().enumerate() {
            let archive = MpqArchive::open(path)?;
            let names = match archive.file_list() {
                Ok(names) => names,
                Err(MpqError::FileNotFound(_)) => {
                    warn!("{} has no (listfile), its files cannot be named", path.display());
                    Vec::new()
                }
                Err(e) => return Err(e.into()),
            };

            for file_path in names {
                let location = FileLocation {
                    file_path: file_path.clone(),
                    archive: index,
                };
                // An override keeps the slot, and so the ID, of the first entry
                match by_name.entry(normalize_filename(&file_path)) {
                    Entry::Occupied(slot) => files[*slot.get()] = location,
                    Entry::Vacant(slot) => {
                        slot.insert(files.len());
                        files.push(location);
                    }
                }
            }
            archives.push(Arc::new(archive));
        }

        info!(
            "Loaded {} entries from {} MPQ files",
            files.len(),
            archive_paths.len()
        );

        let mut named: Vec<(usize, &String)> = by_name.iter().map(|(n, &slot)| (slot, n)).collect();
        named.sort_unstable_by_key(|&(slot, _)| slot);
        listfile.set_tables(
            named
                .into_iter()
                .map(|(slot, name)| (slot as u32 + 1, name.clone())),
        );

        let build_name = config
            .build_name
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self {
            install_dir,
            locale,
            archive_paths,
            archives,
            files,
            by_name,
            listfile,
            build_name,
        })
    }

    fn read(&self, location: &FileLocation) -> Result<Vec<u8>> {
        let archive = self.archives.get(location.archive).ok_or_else(|| {
            StorageError::MissingIndexEntry(format!("archive {} not loaded", location.archive))
        })?;
        Ok(archive.read_file(&location.file_path)?)
    }

    /// Contents of the file assigned `file_data_id`
    #[allow(clippy::unused_async)]
    pub async fn get_file(&self, file_data_id: u32) -> Result<Vec<u8>> {
        let location = (file_data_id as usize)
            .checked_sub(1)
            .and_then(|slot| self.files.get(slot))
            .ok_or_else(|| {
                StorageError::MissingIndexEntry(format!(
                    "FileDataID {file_data_id} is not in any archive"
                ))
            })?;
        self.read(location)
    }

    /// Contents of a file by path, case-insensitive
    #[allow(clippy::unused_async)]
    pub async fn get_file_by_name(&self, name: &str) -> Result<Vec<u8>> {
        let slot = self.by_name.get(&normalize_filename(name)).ok_or_else(|| {
            StorageError::MissingIndexEntry(format!("{name} is not in any archive"))
        })?;
        self.read(&self.files[*slot])
    }

    /// Build name
    ///
    /// The client executable's version resource is not read; the name comes
    /// from the configuration.
    pub fn build_name(&self) -> &str {
        &self.build_name
    }

    /// Locale read from `config.wtf`
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Installation root
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Archives in load order
    pub fn archive_paths(&self) -> &[PathBuf] {
        &self.archive_paths
    }

    /// Number of addressable files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Listfile shared with this source
    pub fn listfile(&self) -> &Arc<ListfileIndex> {
        &self.listfile
    }
}

/// Locale from a `SET locale "xxXX"` line in `config.wtf`
pub fn parse_config_locale(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let mut fields = line.split(' ');
        if fields.nth(1) != Some("locale") {
            return None;
        }
        let value = fields.next()?;
        Some(
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
                .to_string(),
        )
    })
}

async fn read_locale(install_dir: &Path) -> String {
    let path = install_dir.join(CONFIG_WTF);
    let locale = match tokio::fs::read_to_string(&path).await {
        Ok(text) => parse_config_locale(&text),
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            None
        }
    };

    locale.unwrap_or_else(|| {
        info!("Locale not found in config, defaulting to \"{}\"", DEFAULT_LOCALE);
        DEFAULT_LOCALE.to_string()
    })
}

/// Order archive file names the way the client loads them
///
/// Names compare by their part before the first `.`, with `-0` appended when
/// there is no `-`, so `common.mpq` sorts before `common-2.mpq`.
pub fn compare_archive_names(a: &str, b: &str) -> Ordering {
    fn key(name: &str) -> String {
        let stem = name.split('.').next().unwrap_or(name).to_lowercase();
        if stem.contains('-') {
            stem
        } else {
            format!("{stem}-0")
        }
    }
    key(a).cmp(&key(b))
}

async fn list_archives(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut base = Vec::new();
    let mut patches = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.ends_with(".mpq") {
            continue;
        }
        if name.starts_with("patch") {
            patches.push(entry.path());
        } else {
            base.push(entry.path());
        }
    }

    let by_name = |a: &PathBuf, b: &PathBuf| {
        compare_archive_names(
            &a.file_name().unwrap_or_default().to_string_lossy(),
            &b.file_name().unwrap_or_default().to_string_lossy(),
        )
    };
    base.sort_by(by_name);
    patches.sort_by(by_name);
    Ok((base, patches))
}

/// Archive paths in load order
///
/// Base archives of `Data/`, base archives of `Data/<locale>/`, then the patch
/// archives of each in the same order. A missing locale directory is skipped.
pub async fn archive_load_order(data_dir: &Path, locale: &str) -> Result<Vec<PathBuf>> {
    let (base, patches) = list_archives(data_dir).await?;

    let locale_dir = data_dir.join(locale);
    let (locale_base, locale_patches) = if tokio::fs::metadata(&locale_dir).await.is_ok() {
        list_archives(&locale_dir).await?
    } else {
        debug!("no locale directory {}", locale_dir.display());
        (Vec::new(), Vec::new())
    };

    Ok(base
        .into_iter()
        .chain(locale_base)
        .chain(patches)
        .chain(locale_patches)
        .collect())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config_locale() {
        let text =
            "SET gxResolution \"1024x768\"\r\nSET locale \"deDE\"\r\nSET realmList \"x\"\r\n";
        assert_eq!(parse_config_locale(text).as_deref(), Some("deDE"));
        assert_eq!(parse_config_locale("SET gxApi \"d3d\"\n"), None);
    }

    #[test]
    fn test_compare_archive_names() {
        let mut names = vec!["patch-3.mpq", "patch.MPQ", "patch-2.mpq"];
        names.sort_by(|a, b| compare_archive_names(a, b));
        assert_eq!(names, vec!["patch.MPQ", "patch-2.mpq", "patch-3.mpq"]);

        let mut names = vec!["speech.mpq", "common-2.mpq", "common.mpq", "expansion.mpq"];
        names.sort_by(|a, b| compare_archive_names(a, b));
        assert_eq!(
            names,
            vec!["common.mpq", "common-2.mpq", "expansion.mpq", "speech.mpq"]
        );
    }

    #[tokio::test]
    async fn test_archive_load_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dir.path().join(DATA_DIR);
        std::fs::create_dir_all(data.join("enGB")).unwrap();
        for name in ["patch-2.MPQ", "common.MPQ", "patch.MPQ", "readme.txt", "expansion.mpq"] {
            std::fs::write(data.join(name), b"").unwrap();
        }
        for name in ["patch-enGB.MPQ", "locale-enGB.MPQ"] {
            std::fs::write(data.join("enGB").join(name), b"").unwrap();
        }

        let order: Vec<String> = archive_load_order(&data, "enGB")
            .await
            .expect("order")
            .iter()
            .map(|p| {
                p.strip_prefix(&data)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();

        assert_eq!(
            order,
            vec![
                "common.MPQ",
                "expansion.mpq",
                "enGB/locale-enGB.MPQ",
                "patch.MPQ",
                "patch-2.MPQ",
                "enGB/patch-enGB.MPQ",
            ]
        );
    }
}
