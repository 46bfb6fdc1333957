//! # hoard-protocol
//!
//! Remote plumbing for the archive sources: fetch the bytes behind a URL,
//! trying fallback URLs in order, retrying transient failures, and keeping the
//! last good response on disk for offline use.
//!
//! ## Components
//!
//! - [`HttpClient`]: shared, pooled reqwest client over rustls
//! - [`RetryPolicy`]: exponential backoff with jitter for retryable errors
//! - [`DiskCache`]: directory of cached responses with atomic writes
//! - [`Fetcher`]: primary-then-fallback fetching with a cached last resort
//! - [`FetchConfig`]: timeouts, retry policy, cache location, user agent
//!
//! ## Example
//!
//! ```rust,no_run
//! use hoard_protocol::{FetchConfig, Fetcher};
//!
//! # async fn run() -> hoard_protocol::Result<()> {
//! let fetcher = Fetcher::new(FetchConfig::from_env())?;
//! let manifest = fetcher
//!     .get_cached(
//!         "listfile",
//!         &[
//!             "https://example.com/listfile.csv",
//!             "https://mirror.example.com/listfile.csv",
//!         ],
//!     )
//!     .await?;
//! println!("{} bytes", manifest.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod retry;

pub use cache::DiskCache;
pub use client::HttpClient;
pub use config::FetchConfig;
pub use error::{ProtocolError, Result};
pub use fetch::Fetcher;
pub use retry::RetryPolicy;
