//! FileDataID to path index
//!
//! The index is the one structure that keeps changing after a source is
//! open: unknown files get named and later renamed while other tasks read.
//! Readers take a cheap snapshot of the current tables. A writer edits the
//! tables under the write lock, so a reader never sees half of an update.
//! The tables are copied only while some reader still holds a snapshot, and
//! then once per call: pass IDs in batches rather than one call per ID.

mod loader;

pub use loader::ListfileLoader;

use std::collections::HashMap;
use std::sync::Arc;

use hoard_formats::listfile::{ManifestError, parse_manifest};
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, info};

/// Prefix of synthesized names for unlisted FileDataIDs
pub const UNKNOWN_PREFIX: &str = "unknown/";

/// Lower-case a path and use forward slashes
pub fn normalize_filename(name: &str) -> String {
    name.to_lowercase().replace('\\', "/")
}

/// Remove a trailing ` [id]` display suffix
///
/// ```
/// use hoard_storage::listfile::strip_file_entry;
///
/// assert_eq!(strip_file_entry("world/a.blp [42]"), "world/a.blp");
/// assert_eq!(strip_file_entry("world/a.blp"), "world/a.blp");
/// ```
pub fn strip_file_entry(entry: &str) -> &str {
    entry.rfind(" [").map_or(entry, |pos| &entry[..pos])
}

/// Placeholder name for an unlisted FileDataID
pub fn format_unknown_file(file_data_id: u32, ext: &str) -> String {
    format!("{UNKNOWN_PREFIX}{file_data_id}{ext}")
}

/// Which paths [`ListfileIndex::filenames_by_extension`] selects
#[derive(Debug, Clone)]
pub enum ExtensionFilter {
    /// Paths ending with the extension
    Suffix(String),
    /// Paths ending with the extension that do not match the pattern
    SuffixExcluding(String, Regex),
}

impl ExtensionFilter {
    /// Filter on a plain extension
    pub fn suffix(ext: impl Into<String>) -> Self {
        Self::Suffix(ext.into())
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Suffix(ext) => name.ends_with(ext.as_str()),
            Self::SuffixExcluding(ext, exclude) => {
                name.ends_with(ext.as_str()) && !exclude.is_match(name)
            }
        }
    }
}

/// Ordering and decoration of formatted listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Sort numerically by FileDataID instead of by name
    pub sort_by_id: bool,
    /// Append ` [id]` to each name
    pub show_file_data_ids: bool,
}

/// Search term for [`ListfileIndex::filtered_entries`]
#[derive(Debug, Clone)]
pub enum SearchTerm {
    /// Plain substring
    Substring(String),
    /// Regular expression
    Pattern(Regex),
}

impl SearchTerm {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Substring(needle) => name.contains(needle.as_str()),
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

/// One listfile entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileEntry {
    /// FileDataID
    pub file_data_id: u32,
    /// Path
    pub file_name: String,
}

/// Auxiliary ID tables used to name unlisted files
#[derive(Debug, Clone, Default)]
pub struct UnknownSources {
    /// FileDataIDs referenced as textures
    pub texture_ids: Vec<u32>,
    /// FileDataIDs referenced as models
    pub model_ids: Vec<u32>,
    /// FileDataIDs referenced by sound kits
    pub sound_kit_ids: Vec<u32>,
}

/// Number of placeholders added per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnknownCounts {
    /// `.blp` placeholders
    pub textures: usize,
    /// `.m2` placeholders
    pub models: usize,
    /// `.unk_sound` placeholders
    pub sounds: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    ids: HashMap<u32, String>,
    names: HashMap<String, u32>,
    loaded: bool,
}

impl Tables {
    fn from_entries(entries: impl IntoIterator<Item = (u32, String)>) -> Self {
        let mut tables = Self {
            loaded: true,
            ..Self::default()
        };
        for (id, name) in entries {
            tables.insert(id, normalize_filename(&name));
        }
        tables
    }

    fn insert(&mut self, id: u32, name: String) {
        if let Some(previous) = self.ids.insert(id, name.clone()) {
            if previous != name && self.names.get(&previous) == Some(&id) {
                self.names.remove(&previous);
            }
        }
        self.names.insert(name, id);
    }

    fn add_unknowns(&mut self, ids: &[u32], ext: &str) -> usize {
        let mut added = 0;
        for &id in ids {
            if !self.ids.contains_key(&id) {
                self.insert(id, format_unknown_file(id, ext));
                added += 1;
            }
        }
        added
    }
}

/// Thread-safe FileDataID ↔ path index
#[derive(Debug, Default)]
pub struct ListfileIndex {
    tables: RwLock<Arc<Tables>>,
}

impl ListfileIndex {
    /// Create an empty, unloaded index
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<Tables> {
        Arc::clone(&self.tables.read())
    }

    /// Edit in place, copying first only if a snapshot is still out
    fn update<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.write();
        f(Arc::make_mut(&mut tables))
    }

    fn replace(&self, tables: Tables) {
        *self.tables.write() = Arc::new(tables);
    }

    /// Replace the index with a parsed `<id>;<path>` manifest
    ///
    /// A malformed line rejects the whole manifest and leaves the index
    /// untouched. When `retain` is given, only IDs it accepts are kept.
    /// Returns the number of entries kept.
    pub fn load_manifest(
        &self,
        text: &str,
        retain: Option<&dyn Fn(u32) -> bool>,
    ) -> Result<usize, ManifestError> {
        let entries = parse_manifest(text)?;
        let total = entries.len();
        let tables = Tables::from_entries(
            entries
                .into_iter()
                .filter(|(id, _)| retain.is_none_or(|keep| keep(*id))),
        );
        let kept = tables.ids.len();

        debug!("listfile manifest: {} lines, {} entries kept", total, kept);
        self.replace(tables);
        Ok(kept)
    }

    /// Replace the index with `entries`
    pub fn set_tables(&self, entries: impl IntoIterator<Item = (u32, String)>) {
        let tables = Tables::from_entries(entries);
        debug!("listfile tables replaced: {} entries", tables.ids.len());
        self.replace(tables);
    }

    /// Whether a manifest or table set has been installed
    pub fn is_loaded(&self) -> bool {
        self.snapshot().loaded
    }

    /// Number of named FileDataIDs
    pub fn len(&self) -> usize {
        self.snapshot().ids.len()
    }

    /// Whether no FileDataID is named
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path for a FileDataID
    pub fn get_by_id(&self, file_data_id: u32) -> Option<String> {
        self.snapshot().ids.get(&file_data_id).cloned()
    }

    /// Path for a FileDataID, or its `unknown/<id><ext>` placeholder
    pub fn get_by_id_or_unknown(&self, file_data_id: u32, ext: &str) -> String {
        self.get_by_id(file_data_id)
            .unwrap_or_else(|| format_unknown_file(file_data_id, ext))
    }

    /// FileDataID for a path
    ///
    /// The path is normalized first. A miss on a `.mdl` or `.mdx` path retries
    /// with the `.m2` path of the same name.
    pub fn get_by_filename(&self, name: &str) -> Option<u32> {
        let name = normalize_filename(name);
        let tables = self.snapshot();

        tables.names.get(&name).copied().or_else(|| {
            let stem = name
                .strip_suffix(".mdl")
                .or_else(|| name.strip_suffix(".mdx"))?;
            tables.names.get(&format!("{stem}.m2")).copied()
        })
    }

    /// Name every ID in `ids` that has no path yet as `unknown/<id><ext>`
    ///
    /// Returns the number of placeholders added. An empty slice leaves the
    /// index untouched.
    pub fn load_id_table(&self, ids: &[u32], ext: &str) -> usize {
        if ids.is_empty() {
            return 0;
        }
        self.update(|tables| tables.add_unknowns(ids, ext))
    }

    /// Add placeholders for unlisted textures, models and sound kit files
    ///
    /// Running it twice adds nothing the second time.
    pub fn load_unknowns(&self, sources: &UnknownSources) -> UnknownCounts {
        let counts = self.update(|tables| UnknownCounts {
            textures: tables.add_unknowns(&sources.texture_ids, ".blp"),
            models: tables.add_unknowns(&sources.model_ids, ".m2"),
            sounds: tables.add_unknowns(&sources.sound_kit_ids, ".unk_sound"),
        });

        info!(
            "Added {} unknown BLP textures, {} unknown M2 models and {} unknown sound files to listfile",
            counts.textures, counts.models, counts.sounds
        );
        counts
    }

    /// Rename files once their real extension is known
    ///
    /// Each `(id, ext)` pair becomes `unknown/<id><ext>`, replacing whatever
    /// placeholder the ID had.
    pub fn ingest_identified_files(&self, entries: &[(u32, String)]) {
        self.update(|tables| {
            for (id, ext) in entries {
                tables.insert(*id, format_unknown_file(*id, ext));
            }
        });
        debug!("ingested {} identified files", entries.len());
    }

    /// Formatted names of every file matching any of `filters`
    pub fn filenames_by_extension(
        &self,
        filters: &[ExtensionFilter],
        options: FormatOptions,
    ) -> Vec<String> {
        let ids = self
            .snapshot()
            .ids
            .iter()
            .filter(|(_, name)| filters.iter().any(|filter| filter.matches(name)))
            .map(|(&id, _)| id)
            .collect();
        self.format_entries(ids, options)
    }

    /// Every entry, formatted
    pub fn full_listfile(&self, options: FormatOptions) -> Vec<String> {
        let ids = self.snapshot().ids.keys().copied().collect();
        self.format_entries(ids, options)
    }

    /// Entries whose path matches `term`, in no particular order
    pub fn filtered_entries(&self, term: &SearchTerm) -> Vec<FileEntry> {
        self.snapshot()
            .ids
            .iter()
            .filter(|(_, name)| term.matches(name))
            .map(|(&file_data_id, name)| FileEntry {
                file_data_id,
                file_name: name.clone(),
            })
            .collect()
    }

    /// Turn IDs into display names, sorted per `options`
    pub fn format_entries(&self, mut ids: Vec<u32>, options: FormatOptions) -> Vec<String> {
        if options.sort_by_id {
            ids.sort_unstable();
        }

        let tables = self.snapshot();
        let mut entries: Vec<String> = ids
            .into_iter()
            .map(|id| {
                let name = tables
                    .ids
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| format_unknown_file(id, ""));
                if options.show_file_data_ids {
                    format!("{name} [{id}]")
                } else {
                    name
                }
            })
            .collect();

        if !options.sort_by_id {
            entries.sort();
        }
        entries
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index() -> ListfileIndex {
        let index = ListfileIndex::new();
        index.set_tables([
            (10, "World/Maps/Azeroth.wdt".to_string()),
            (3, "creature\\wolf\\wolf.m2".to_string()),
            (7, "interface/icons/inv_sword.blp".to_string()),
            (8, "world/wmo/keep.wmo".to_string()),
            (9, "world/wmo/keep_000.wmo".to_string()),
        ]);
        index
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_filename("Foo\\Bar.BLP"), "foo/bar.blp");

        let index = index();
        assert_eq!(index.get_by_filename("world/maps/azeroth.wdt"), Some(10));
        assert_eq!(index.get_by_filename("WORLD\\MAPS\\AZEROTH.WDT"), Some(10));
        assert_eq!(index.get_by_id(3).as_deref(), Some("creature/wolf/wolf.m2"));
    }

    #[test]
    fn test_mdx_falls_back_to_m2() {
        let index = index();
        assert_eq!(index.get_by_filename("Creature\\Wolf\\Wolf.mdx"), Some(3));
        assert_eq!(index.get_by_filename("creature/wolf/wolf.mdl"), Some(3));
        assert_eq!(index.get_by_filename("creature/wolf/wolf.blp"), None);
    }

    #[test]
    fn test_unknown_placeholders() {
        let index = index();
        assert_eq!(index.get_by_id_or_unknown(3, ".blp"), "creature/wolf/wolf.m2");
        assert_eq!(index.get_by_id_or_unknown(99, ".blp"), "unknown/99.blp");
        assert_eq!(format_unknown_file(5, ""), "unknown/5");
    }

    #[test]
    fn test_load_unknowns_is_idempotent() {
        let index = index();
        let sources = UnknownSources {
            texture_ids: vec![7, 100, 101],
            model_ids: vec![3, 200],
            sound_kit_ids: vec![300, 100],
        };

        let first = index.load_unknowns(&sources);
        assert_eq!(
            first,
            UnknownCounts {
                textures: 2,
                models: 1,
                sounds: 1
            }
        );
        assert_eq!(index.get_by_id(100).as_deref(), Some("unknown/100.blp"));
        assert_eq!(index.get_by_id(300).as_deref(), Some("unknown/300.unk_sound"));
        assert_eq!(index.get_by_filename("unknown/200.m2"), Some(200));

        assert_eq!(index.load_unknowns(&sources), UnknownCounts::default());
        assert_eq!(index.load_id_table(&[7, 400], ".blp"), 1);
    }

    #[test]
    fn test_ingest_identified_files() {
        let index = index();
        index.load_unknowns(&UnknownSources {
            sound_kit_ids: vec![300],
            ..UnknownSources::default()
        });
        index.ingest_identified_files(&[(300, ".ogg".to_string())]);

        assert_eq!(index.get_by_id(300).as_deref(), Some("unknown/300.ogg"));
        assert_eq!(index.get_by_filename("unknown/300.ogg"), Some(300));
        assert_eq!(index.get_by_filename("unknown/300.unk_sound"), None);
    }

    #[test]
    fn test_load_manifest() {
        let index = ListfileIndex::new();
        assert!(!index.is_loaded());

        let count = index
            .load_manifest("1;a.txt\n2;B.TXT\n3;c.txt\n", Some(&|id: u32| id != 2))
            .expect("manifest");
        assert_eq!(count, 2);
        assert!(index.is_loaded());
        assert_eq!(index.get_by_id(2), None);

        let err = index.load_manifest("4;d.txt\nbroken\n", None);
        assert!(err.is_err());
        assert_eq!(index.len(), 2, "a rejected manifest leaves the index alone");
    }

    #[test]
    fn test_filenames_by_extension() {
        let index = index();
        let wmo = ExtensionFilter::SuffixExcluding(
            ".wmo".to_string(),
            Regex::new(r"_\d{3}\.wmo$").unwrap(),
        );

        let names = index.filenames_by_extension(
            &[ExtensionFilter::suffix(".m2"), wmo],
            FormatOptions::default(),
        );
        assert_eq!(names, vec!["creature/wolf/wolf.m2", "world/wmo/keep.wmo"]);
    }

    #[test]
    fn test_format_entries() {
        let index = index();
        let by_id = index.format_entries(
            vec![10, 3, 42],
            FormatOptions {
                sort_by_id: true,
                show_file_data_ids: true,
            },
        );
        assert_eq!(
            by_id,
            vec![
                "creature/wolf/wolf.m2 [3]",
                "world/maps/azeroth.wdt [10]",
                "unknown/42 [42]"
            ]
        );
        assert_eq!(strip_file_entry(&by_id[0]), "creature/wolf/wolf.m2");

        let by_name = index.full_listfile(FormatOptions::default());
        assert_eq!(by_name.first().map(String::as_str), Some("creature/wolf/wolf.m2"));
        assert_eq!(by_name.len(), 5);
    }

    #[test]
    fn test_filtered_entries() {
        let index = index();
        let mut hits = index.filtered_entries(&SearchTerm::Substring("wmo".into()));
        hits.sort();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_data_id, 8);

        let re = SearchTerm::Pattern(Regex::new(r"^interface/.*\.blp$").unwrap());
        assert_eq!(
            index.filtered_entries(&re),
            vec![FileEntry {
                file_data_id: 7,
                file_name: "interface/icons/inv_sword.blp".into()
            }]
        );
    }

    #[test]
    fn test_writes_without_readers_edit_in_place() {
        let index = index();
        let before = Arc::as_ptr(&index.snapshot());

        let ids: Vec<u32> = (1000..6000).collect();
        assert_eq!(index.load_id_table(&ids, ".blp"), 5000);
        assert_eq!(index.load_id_table(&[], ".blp"), 0);
        assert_eq!(Arc::as_ptr(&index.snapshot()), before);
        assert_eq!(index.len(), 5005);
    }

    #[test]
    fn test_held_snapshot_is_unchanged_by_writes() {
        let index = index();
        let held = index.snapshot();

        index.load_id_table(&[1000, 1001], ".m2");
        assert!(held.ids.get(&1000).is_none());
        assert_eq!(held.ids.len(), 5);
        assert_eq!(index.get_by_id(1001).as_deref(), Some("unknown/1001.m2"));
    }

    #[test]
    fn test_concurrent_readers_see_whole_updates() {
        let index = Arc::new(index());
        let writer = {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for id in 1000..1200 {
                    index.load_id_table(&[id], ".blp");
                }
            })
        };

        for _ in 0..200 {
            let len = index.len();
            assert!((5..=205).contains(&len));
            if let Some(name) = index.get_by_id(1000) {
                assert_eq!(name, "unknown/1000.blp");
            }
        }
        writer.join().unwrap();
        assert_eq!(index.len(), 205);
    }
}
