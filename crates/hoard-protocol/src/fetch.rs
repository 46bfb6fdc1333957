//! Fetching with fallback URLs and a cached last resort

use crate::cache::DiskCache;
use crate::client::HttpClient;
use crate::config::FetchConfig;
use crate::error::{ProtocolError, Result};
use crate::retry::RetryPolicy;

/// Fetches URL bodies with retry, fallback and optional caching
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: HttpClient,
    retry: RetryPolicy,
    cache: Option<DiskCache>,
}

impl Fetcher {
    /// Build a fetcher; a cache is attached when `cache_dir` is set
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(&config)?,
            retry: config.retry_policy,
            cache: config.cache_dir.map(DiskCache::new),
        })
    }

    /// Replace the disk cache
    #[must_use]
    pub fn with_cache(mut self, cache: DiskCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attached disk cache
    pub fn cache(&self) -> Option<&DiskCache> {
        self.cache.as_ref()
    }

    /// Fetch one URL, retrying transient failures
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.retry.execute(|| self.client.get(url)).await
    }

    /// Try each URL in order and return the first successful body
    pub async fn get_with_fallback<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<u8>> {
        let mut last_error = None;

        for url in urls {
            let url = url.as_ref();
            match self.get(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(ProtocolError::AllUrlsFailed {
                attempted: urls.len(),
                last_error: Box::new(e),
            }),
            None => Err(ProtocolError::NoUrls),
        }
    }

    /// Cached copy under `cache_key` if present, else fetch with fallback and cache it
    ///
    /// For content addressed by its own hash, which never changes once
    /// published. Without a cache this is [`Fetcher::get_with_fallback`].
    pub async fn get_cache_first<S: AsRef<str>>(
        &self,
        cache_key: &str,
        urls: &[S],
    ) -> Result<Vec<u8>> {
        let Some(cache) = &self.cache else {
            return self.get_with_fallback(urls).await;
        };

        match cache.get(cache_key).await {
            Ok(Some(body)) => {
                tracing::debug!("Cache hit for {}", cache_key);
                return Ok(body);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached {}: {}", cache_key, e),
        }

        let body = self.get_with_fallback(urls).await?;
        if let Err(e) = cache.put(cache_key, &body).await {
            tracing::warn!("Failed to cache {}: {}", cache_key, e);
        }
        Ok(body)
    }

    /// Fetch with fallback and refresh the cached copy under `cache_key`
    ///
    /// When every URL fails, the previously cached copy is returned instead.
    /// Without a cache this is [`Fetcher::get_with_fallback`].
    pub async fn get_cached<S: AsRef<str>>(&self, cache_key: &str, urls: &[S]) -> Result<Vec<u8>> {
        let Some(cache) = &self.cache else {
            return self.get_with_fallback(urls).await;
        };

        match self.get_with_fallback(urls).await {
            Ok(body) => {
                if let Err(e) = cache.put(cache_key, &body).await {
                    tracing::warn!("Failed to cache {}: {}", cache_key, e);
                }
                Ok(body)
            }
            Err(e) => match cache.get(cache_key).await {
                Ok(Some(body)) => {
                    tracing::warn!("Using cached {} after fetch failure: {}", cache_key, e);
                    Ok(body)
                }
                _ => Err(e),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> FetchConfig {
        FetchConfig::default().with_retry_policy(RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        })
    }

    #[tokio::test]
    async fn test_fallback_after_primary_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/primary"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fallback"))
            .respond_with(ResponseTemplate::new(200).set_body_string("from fallback"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(config()).expect("fetcher");
        let urls = [
            format!("{}/primary", server.uri()),
            format!("{}/fallback", server.uri()),
        ];
        let body = fetcher.get_with_fallback(&urls).await.expect("fetch");
        assert_eq!(body, b"from fallback");
    }

    #[tokio::test]
    async fn test_all_urls_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(config()).expect("fetcher");
        let urls = [format!("{}/a", server.uri()), format!("{}/b", server.uri())];
        let err = fetcher.get_with_fallback(&urls).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::AllUrlsFailed { attempted: 2, .. }
        ));

        let none: [&str; 0] = [];
        assert!(matches!(
            fetcher.get_with_fallback(&none).await,
            Err(ProtocolError::NoUrls)
        ));
    }

    #[tokio::test]
    async fn test_cache_first_skips_network_on_hit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blob"))
            .respond_with(ResponseTemplate::new(200).set_body_string("blob body"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(config().with_cache_dir(dir.path())).expect("fetcher");
        let urls = [format!("{}/blob", server.uri())];

        for _ in 0..3 {
            let body = fetcher.get_cache_first("blob", &urls).await.expect("fetch");
            assert_eq!(body, b"blob body");
        }
        assert_eq!(
            fetcher.cache().unwrap().get("blob").await.unwrap().as_deref(),
            Some(&b"blob body"[..])
        );
    }

    #[tokio::test]
    async fn test_cached_copy_used_when_offline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/listfile"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1;a.txt"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/listfile"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(config().with_cache_dir(dir.path())).expect("fetcher");
        let urls = [format!("{}/listfile", server.uri())];

        let fresh = fetcher.get_cached("listfile", &urls).await.expect("fresh");
        assert_eq!(fresh, b"1;a.txt");

        let offline = fetcher.get_cached("listfile", &urls).await.expect("cached");
        assert_eq!(offline, b"1;a.txt");

        assert!(fetcher.get_cached("other", &urls).await.is_err());
    }
}
