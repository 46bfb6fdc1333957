//! Fetch configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

const DEFAULT_USER_AGENT: &str = concat!("hoard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout
    pub connect_timeout: Duration,

    /// Whole-request timeout
    pub request_timeout: Duration,

    /// Retry policy applied to each URL
    pub retry_policy: RetryPolicy,

    /// Directory for cached responses; `None` disables caching
    pub cache_dir: Option<PathBuf>,

    /// User-Agent header
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
            cache_dir: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// Create configuration from environment variables
    ///
    /// Reads `HOARD_CONNECT_TIMEOUT`, `HOARD_REQUEST_TIMEOUT` (seconds),
    /// `HOARD_CACHE_DIR` and `HOARD_USER_AGENT`, plus the variables read by
    /// [`RetryPolicy::from_env`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(default, Duration::from_secs)
        };

        Self {
            connect_timeout: secs("HOARD_CONNECT_TIMEOUT", defaults.connect_timeout),
            request_timeout: secs("HOARD_REQUEST_TIMEOUT", defaults.request_timeout),
            retry_policy: RetryPolicy::from_env(),
            cache_dir: std::env::var("HOARD_CACHE_DIR").map(PathBuf::from).ok(),
            user_agent: std::env::var("HOARD_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Set the cache directory
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let config = FetchConfig::default()
            .with_cache_dir("/tmp/hoard")
            .with_retry_policy(RetryPolicy::none())
            .with_request_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");

        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/hoard")));
        assert_eq!(config.retry_policy.max_attempts, 0);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_default_user_agent() {
        assert!(FetchConfig::default().user_agent.starts_with("hoard/"));
    }
}
