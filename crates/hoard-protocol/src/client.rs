//! Shared HTTP client

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::sync::{Arc, Once};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{ProtocolError, Result};

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the ring provider for rustls unless one is already installed
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client with pooled connections
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    request_timeout: Duration,
}

impl HttpClient {
    /// Build a client from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        ensure_crypto_provider();
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .use_rustls_tls()
            // CDN hosts are frequently plain HTTP
            .https_only(false)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            request_timeout: config.request_timeout,
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET a URL and return the body of a 200 response
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProtocolError::Timeout
                } else {
                    ProtocolError::Http(e)
                }
            })?;

        let response = check_status(response)?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn check_status(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ProtocolError::RateLimited { retry_after })
        }
        StatusCode::SERVICE_UNAVAILABLE => Err(ProtocolError::ServiceUnavailable),
        status if status.is_server_error() => Err(ProtocolError::ServerError(status)),
        status => Err(ProtocolError::HttpStatus(status)),
    }
}
