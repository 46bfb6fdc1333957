//! Configuration for opening archive sources

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Community listfile, primary location
pub const DEFAULT_LISTFILE_URL: &str =
    "https://github.com/wowdev/wow-listfile/releases/latest/download/community-listfile.csv";

/// Community listfile mirror
pub const DEFAULT_LISTFILE_FALLBACK_URL: &str =
    "https://raw.githubusercontent.com/wowdev/wow-listfile/master/community-listfile.csv";

/// Community TACT key list, primary location
pub const DEFAULT_TACT_KEYS_URL: &str =
    "https://raw.githubusercontent.com/wowdev/TACTKeys/master/WoW.txt";

/// TACT key list mirror
pub const DEFAULT_TACT_KEYS_FALLBACK_URL: &str =
    "https://github.com/wowdev/TACTKeys/raw/master/WoW.txt";

/// Locale used when nothing else selects one
pub const DEFAULT_LOCALE: &str = "enUS";

/// Configuration shared by the CASC and MPQ sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Locale code such as `enUS`; MPQ installs override it from `config.wtf`
    pub locale: String,

    /// Listfile URLs, tried in order
    pub listfile_urls: Vec<String>,

    /// TACT key list URLs, tried in order
    pub tact_key_urls: Vec<String>,

    /// JSON cache of known TACT keys
    pub key_cache_path: Option<PathBuf>,

    /// Name FileDataIDs that no listfile entry covers
    pub enable_unknown_files: bool,

    /// Build name reported instead of the one read from the build
    pub build_name: Option<String>,

    /// Default timeout for a single file read
    pub request_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            listfile_urls: vec![
                DEFAULT_LISTFILE_URL.to_string(),
                DEFAULT_LISTFILE_FALLBACK_URL.to_string(),
            ],
            tact_key_urls: vec![
                DEFAULT_TACT_KEYS_URL.to_string(),
                DEFAULT_TACT_KEYS_FALLBACK_URL.to_string(),
            ],
            key_cache_path: None,
            enable_unknown_files: true,
            build_name: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl StorageConfig {
    /// Create a configuration for `locale`
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Reads `HOARD_LOCALE`, `HOARD_LISTFILE_URL`, `HOARD_TACT_KEYS_URL`,
    /// `HOARD_KEY_CACHE`, `HOARD_UNKNOWN_FILES`, `HOARD_BUILD_NAME` and
    /// `HOARD_READ_TIMEOUT` (seconds). A URL variable replaces the primary
    /// URL and keeps the default mirror as fallback.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(locale) = std::env::var("HOARD_LOCALE") {
            config.locale = locale;
        }
        if let Ok(url) = std::env::var("HOARD_LISTFILE_URL") {
            replace_primary(&mut config.listfile_urls, url);
        }
        if let Ok(url) = std::env::var("HOARD_TACT_KEYS_URL") {
            replace_primary(&mut config.tact_key_urls, url);
        }
        if let Ok(path) = std::env::var("HOARD_KEY_CACHE") {
            config.key_cache_path = Some(PathBuf::from(path));
        }
        if let Some(enabled) = std::env::var("HOARD_UNKNOWN_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.enable_unknown_files = enabled;
        }
        if let Ok(name) = std::env::var("HOARD_BUILD_NAME") {
            config.build_name = Some(name);
        }
        if let Some(secs) = std::env::var("HOARD_READ_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Set the locale
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Replace the listfile URLs
    #[must_use]
    pub fn with_listfile_urls(mut self, urls: Vec<String>) -> Self {
        self.listfile_urls = urls;
        self
    }

    /// Replace the TACT key list URLs
    #[must_use]
    pub fn with_tact_key_urls(mut self, urls: Vec<String>) -> Self {
        self.tact_key_urls = urls;
        self
    }

    /// Set the key cache path
    #[must_use]
    pub fn with_key_cache<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.key_cache_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable naming of unlisted FileDataIDs
    #[must_use]
    pub const fn with_unknown_files(mut self, enable: bool) -> Self {
        self.enable_unknown_files = enable;
        self
    }

    /// Override the reported build name
    #[must_use]
    pub fn with_build_name(mut self, name: impl Into<String>) -> Self {
        self.build_name = Some(name.into());
        self
    }

    /// Set the per-read timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn replace_primary(urls: &mut Vec<String>, url: String) {
    match urls.first_mut() {
        Some(primary) => *primary = url,
        None => urls.push(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.locale, "enUS");
        assert_eq!(config.listfile_urls.len(), 2);
        assert_eq!(config.tact_key_urls.len(), 2);
        assert!(config.enable_unknown_files);
        assert!(config.key_cache_path.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = StorageConfig::new("deDE")
            .with_listfile_urls(vec!["http://localhost/listfile.csv".into()])
            .with_key_cache("/tmp/keys.json")
            .with_unknown_files(false)
            .with_build_name("1.12.1.5875")
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.locale, "deDE");
        assert_eq!(config.listfile_urls, vec!["http://localhost/listfile.csv"]);
        assert_eq!(config.key_cache_path, Some(PathBuf::from("/tmp/keys.json")));
        assert!(!config.enable_unknown_files);
        assert_eq!(config.build_name.as_deref(), Some("1.12.1.5875"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
