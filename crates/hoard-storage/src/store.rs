//! Where encoded (BLTE) content comes from
//!
//! Both stores address content by encoding key using the CDN directory
//! layout: `<ab>/<cd>/<hex>`, where `ab` and `cd` are the first two bytes of
//! the lower-case hex key.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hoard_crypto::EncodingKey;
use hoard_protocol::Fetcher;
use tracing::debug;

use crate::{Result, StorageError};

/// Source of encoded content
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Encoded bytes stored under `key`
    async fn fetch(&self, key: &EncodingKey) -> Result<Vec<u8>>;
}

/// `<ab>/<cd>/<hex>` relative path for `key`
pub fn content_path(key: &EncodingKey) -> String {
    let hex = key.to_hex();
    format!("{}/{}/{}", &hex[0..2], &hex[2..4], hex)
}

/// Directory of loose files in CDN layout
#[derive(Debug, Clone)]
pub struct LooseFileStore {
    root: PathBuf,
}

impl LooseFileStore {
    /// Serve files below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding `key`
    pub fn path_for(&self, key: &EncodingKey) -> PathBuf {
        self.root.join(content_path(key))
    }
}

#[async_trait]
impl ContentStore for LooseFileStore {
    async fn fetch(&self, key: &EncodingKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!("read {} bytes from {}", data.len(), path.display());
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                StorageError::MissingIndexEntry(format!("encoding key {key} not in store")),
            ),
            Err(e) => Err(e.into()),
        }
    }
}

/// CDN hosts serving `{path}/data/...`
#[derive(Debug, Clone)]
pub struct CdnStore {
    fetcher: Fetcher,
    hosts: Vec<String>,
    path: String,
    use_https: bool,
}

impl CdnStore {
    /// Fetch from `hosts` in order, below the product `path` (e.g. `tpr/wow`)
    pub fn new(fetcher: Fetcher, hosts: Vec<String>, path: impl Into<String>) -> Self {
        Self {
            fetcher,
            hosts,
            path: path.into().trim_matches('/').to_string(),
            use_https: true,
        }
    }

    /// Use plain HTTP
    #[must_use]
    pub fn with_http(mut self) -> Self {
        self.use_https = false;
        self
    }

    /// URL of `key` on every host, in fallback order
    pub fn urls_for(&self, key: &EncodingKey) -> Vec<String> {
        let scheme = if self.use_https { "https" } else { "http" };
        let relative = content_path(key);
        self.hosts
            .iter()
            .map(|host| format!("{scheme}://{host}/{}/data/{relative}", self.path))
            .collect()
    }
}

#[async_trait]
impl ContentStore for CdnStore {
    async fn fetch(&self, key: &EncodingKey) -> Result<Vec<u8>> {
        let urls = self.urls_for(key);
        // Encoded content never changes under its key
        let data = self
            .fetcher
            .get_cache_first(&format!("data-{}", key.to_hex()), &urls)
            .await?;
        debug!("fetched {} ({} bytes)", key, data.len());
        Ok(data)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use hoard_protocol::{FetchConfig, RetryPolicy};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key() -> EncodingKey {
        EncodingKey::from_hex("0123456789abcdef0123456789abcdef").expect("hex")
    }

    #[test]
    fn test_content_path() {
        assert_eq!(
            content_path(&key()),
            "01/23/0123456789abcdef0123456789abcdef"
        );
    }

    #[tokio::test]
    async fn test_loose_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LooseFileStore::new(dir.path());
        let target = store.path_for(&key());
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"BLTE").unwrap();

        assert_eq!(store.fetch(&key()).await.expect("fetch"), b"BLTE");

        let other = EncodingKey::from_data(b"other");
        let err = store.fetch(&other).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingIndexEntry);
    }

    #[tokio::test]
    async fn test_cdn_store_host_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tpr/wow/data/01/23/0123456789abcdef0123456789abcdef"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"frame".to_vec()))
            .mount(&server)
            .await;

        let fetcher =
            Fetcher::new(FetchConfig::default().with_retry_policy(RetryPolicy::none()))
                .expect("fetcher");
        let live = server.uri().trim_start_matches("http://").to_string();
        let store = CdnStore::new(fetcher, vec!["127.0.0.1:9".to_string(), live], "/tpr/wow/")
            .with_http();

        let urls = store.urls_for(&key());
        assert_eq!(
            urls[0],
            "http://127.0.0.1:9/tpr/wow/data/01/23/0123456789abcdef0123456789abcdef"
        );
        assert_eq!(store.fetch(&key()).await.expect("fetch"), b"frame");
    }

    #[tokio::test]
    async fn test_cdn_store_reads_cache_before_network() {
        let cache = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tpr/wow/data/01/23/0123456789abcdef0123456789abcdef"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"frame".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(
            FetchConfig::default()
                .with_retry_policy(RetryPolicy::none())
                .with_cache_dir(cache.path()),
        )
        .expect("fetcher");
        let host = server.uri().trim_start_matches("http://").to_string();
        let store = CdnStore::new(fetcher, vec![host], "tpr/wow").with_http();

        assert_eq!(store.fetch(&key()).await.expect("first"), b"frame");
        assert_eq!(store.fetch(&key()).await.expect("second"), b"frame");
    }
}
