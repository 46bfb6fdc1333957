//! Remote listfile download

use hoard_protocol::Fetcher;
use tracing::info;

use super::ListfileIndex;
use crate::Result;

const CACHE_KEY: &str = "listfile.csv";

/// Downloads the listfile manifest, with a cached copy as last resort
#[derive(Debug, Clone)]
pub struct ListfileLoader {
    fetcher: Fetcher,
    urls: Vec<String>,
}

impl ListfileLoader {
    /// Fetch from `urls` in order
    pub fn new(fetcher: Fetcher, urls: Vec<String>) -> Self {
        Self { fetcher, urls }
    }

    /// Manifest text from the first URL that answers, or the cached copy
    pub async fn fetch(&self) -> Result<String> {
        let body = self.fetcher.get_cached(CACHE_KEY, &self.urls).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetch the manifest and install it into `index`
    ///
    /// Returns the number of entries kept after `retain`.
    pub async fn load_into(
        &self,
        index: &ListfileIndex,
        retain: Option<&(dyn Fn(u32) -> bool + Sync)>,
    ) -> Result<usize> {
        let text = self.fetch().await?;
        let count = index.load_manifest(&text, retain.map(|keep| keep as &dyn Fn(u32) -> bool))?;
        info!("Loaded {} listfile entries", count);
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::StorageError;
    use hoard_protocol::{FetchConfig, RetryPolicy};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(cache: &std::path::Path) -> Fetcher {
        Fetcher::new(
            FetchConfig::default()
                .with_retry_policy(RetryPolicy::none())
                .with_cache_dir(cache),
        )
        .expect("fetcher")
    }

    #[tokio::test]
    async fn test_primary_then_fallback() {
        let cache = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/primary.csv"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fallback.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1;A.txt\n2;b.txt\n5;c.txt\n"))
            .mount(&server)
            .await;

        let loader = ListfileLoader::new(
            fetcher(cache.path()),
            vec![
                format!("{}/primary.csv", server.uri()),
                format!("{}/fallback.csv", server.uri()),
            ],
        );
        let index = ListfileIndex::new();
        let count = loader
            .load_into(&index, Some(&|id: u32| id < 5))
            .await
            .expect("load");

        assert_eq!(count, 2);
        assert_eq!(index.get_by_filename("a.txt"), Some(1));
        assert_eq!(index.get_by_id(5), None);
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_rejected() {
        let cache = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1;a.txt\nnot-a-line\n"))
            .mount(&server)
            .await;

        let loader =
            ListfileLoader::new(fetcher(cache.path()), vec![format!("{}/l.csv", server.uri())]);
        let index = ListfileIndex::new();
        let err = loader.load_into(&index, None).await.unwrap_err();

        assert!(matches!(err, StorageError::MalformedHeader(_)));
        assert!(!index.is_loaded());
    }
}
