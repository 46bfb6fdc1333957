//! On-disk response cache
//!
//! Each entry is one file named after its sanitized key. Writes go to a
//! temporary file in the same directory and are renamed into place, so a
//! reader never observes a partially written entry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory of cached response bodies
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Use `dir` as the cache directory; it is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced with `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        // Keep leading dots from producing hidden or relative names
        let name = name.trim_start_matches('.');
        self.dir.join(if name.is_empty() { "_" } else { name })
    }

    /// Cached body for `key`, `None` when absent
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store `data` under `key`, replacing any previous entry atomically
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.path_for(key);
        let temp = target.with_extension(format!(
            "tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = tokio::fs::write(&temp, data).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&temp, &target).await?;

        tracing::debug!("cached {} bytes as {}", data.len(), target.display());
        Ok(())
    }

    /// Remove the entry for `key` if present
    pub async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
