//! Decryption key ring
//!
//! Keys come from three places: a local JSON cache, a remote `name key` text
//! list, and keys discovered at runtime through [`KeyRing::add_key`]. Adding a
//! key that changes the ring schedules one save of the cache; several adds in
//! a row share the same save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hoard_crypto::keys::is_valid_key_pair;
use hoard_crypto::{TactKey, TactKeyProvider, TactKeyStore};
use hoard_protocol::Fetcher;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Result;

#[derive(Debug)]
struct Inner {
    keys: RwLock<TactKeyStore>,
    cache_path: Option<PathBuf>,
    save_pending: AtomicBool,
}

/// Shared, cloneable key ring
#[derive(Debug, Clone)]
pub struct KeyRing {
    inner: Arc<Inner>,
}

impl KeyRing {
    /// Create an empty ring persisting to `cache_path` when given
    pub fn new(cache_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                keys: RwLock::new(TactKeyStore::new()),
                cache_path,
                save_pending: AtomicBool::new(false),
            }),
        }
    }

    /// Create a ring without a cache file
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Cache file location
    pub fn cache_path(&self) -> Option<&Path> {
        self.inner.cache_path.as_deref()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.inner.keys.read().len()
    }

    /// Whether the ring holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a key given as hex strings
    ///
    /// Returns `false` when the pair fails validation (16 hex characters of
    /// name, 32 of key). A pair that changes the ring is logged and a save is
    /// scheduled.
    pub fn add_key(&self, key_name: &str, key: &str) -> bool {
        let Some(parsed) = parse_pair(key_name, key) else {
            return false;
        };

        if self.inner.keys.write().add(parsed) {
            info!(
                "Registered new decryption key {} -> {}",
                parsed.name_hex(),
                parsed.key_hex()
            );
            self.schedule_save();
        }
        true
    }

    /// Load the cache file, then merge the remote key list
    ///
    /// A missing or unreadable cache is not an error. The cache is applied
    /// before the remote list is fetched, so a remote failure still leaves
    /// the cached keys in place. Returns the number of keys taken from the
    /// remote list.
    pub async fn load<S: AsRef<str>>(&self, fetcher: &Fetcher, urls: &[S]) -> Result<usize> {
        self.load_cache().await;

        let body = fetcher.get_with_fallback(urls).await?;
        let added = self.merge_key_list(&String::from_utf8_lossy(&body));

        if added > 0 {
            info!(
                "Added {} tact keys from {}",
                added,
                urls.first().map_or("", |url| url.as_ref())
            );
        }
        Ok(added)
    }

    /// Load keys from the JSON cache file, returning how many were accepted
    pub async fn load_cache(&self) -> usize {
        let Some(path) = self.cache_path() else {
            return 0;
        };

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                debug!("No tact key cache at {}: {}", path.display(), e);
                return 0;
            }
        };
        let cached: BTreeMap<String, String> = match serde_json::from_str(&text) {
            Ok(map) => map,
            Err(e) => {
                warn!("Ignoring unreadable tact key cache {}: {}", path.display(), e);
                return 0;
            }
        };

        let mut added = 0;
        let mut keys = self.inner.keys.write();
        for (name, key) in &cached {
            match parse_pair(name, key) {
                Some(parsed) => {
                    keys.add(parsed);
                    added += 1;
                }
                None => warn!("Skipping invalid tact key from cache: {} -> {}", name, key),
            }
        }
        drop(keys);

        info!("Loaded {} tact keys from local cache", added);
        added
    }

    /// Merge a `name key` text list, one pair per line
    ///
    /// Lines without exactly two space-separated fields are ignored; pairs
    /// that fail validation are logged and skipped. Returns the number of
    /// pairs accepted.
    pub fn merge_key_list(&self, text: &str) -> usize {
        let mut added = 0;
        let mut changed = false;
        let mut keys = self.inner.keys.write();

        for line in text.split(['\r', '\n']) {
            let parts: Vec<&str> = line.split(' ').collect();
            let [name, key] = parts.as_slice() else {
                continue;
            };
            let (name, key) = (name.trim(), key.trim());

            match parse_pair(name, key) {
                Some(parsed) => {
                    changed |= keys.add(parsed);
                    added += 1;
                }
                None => warn!("Skipping invalid remote tact key: {} -> {}", name, key),
            }
        }
        drop(keys);

        if changed {
            self.schedule_save();
        }
        added
    }

    fn schedule_save(&self) {
        if self.inner.cache_path.is_none() || self.inner.save_pending.swap(true, Ordering::AcqRel)
        {
            return;
        }

        // Without a runtime the save stays pending until `flush`
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let ring = self.clone();
        handle.spawn(async move {
            tokio::task::yield_now().await;
            if let Err(e) = ring.flush().await {
                warn!("Failed to save tact keys: {}", e);
            }
        });
    }

    /// Write the cache file now, clearing any pending save
    pub async fn flush(&self) -> Result<()> {
        self.inner.save_pending.store(false, Ordering::Release);
        self.save().await
    }

    /// Write every key to the cache file as tab-indented JSON
    pub async fn save(&self) -> Result<()> {
        let Some(path) = self.cache_path() else {
            return Ok(());
        };

        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        debug!("Saved {} tact keys to {}", self.len(), path.display());
        Ok(())
    }

    fn to_json(&self) -> Result<Vec<u8>> {
        let map: BTreeMap<String, String> = self
            .inner
            .keys
            .read()
            .iter()
            .map(|key| (key.name_hex(), key.key_hex()))
            .collect();

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        map.serialize(&mut serializer).map_err(std::io::Error::other)?;
        Ok(out)
    }
}

impl TactKeyProvider for KeyRing {
    fn get_key(&self, key_name: u64) -> Option<[u8; 16]> {
        self.inner.keys.read().get(key_name).copied()
    }
}

fn parse_pair(key_name: &str, key: &str) -> Option<TactKey> {
    if !is_valid_key_pair(key_name, key) {
        return None;
    }
    TactKey::from_hex_pair(&key_name.to_lowercase(), &key.to_lowercase()).ok()
}
