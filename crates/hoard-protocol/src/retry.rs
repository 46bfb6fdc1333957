//! Retry policy with exponential backoff

use rand::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_attempts: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add up to 30% random delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Read `HOARD_MAX_RETRIES`, `HOARD_RETRY_BACKOFF_MS`, `HOARD_MAX_BACKOFF_SECS`,
    /// `HOARD_BACKOFF_MULTIPLIER` and `HOARD_RETRY_JITTER`
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|s| s.parse().ok())
        }

        let defaults = Self::default();
        Self {
            max_attempts: var("HOARD_MAX_RETRIES").unwrap_or(defaults.max_attempts),
            initial_backoff: var("HOARD_RETRY_BACKOFF_MS")
                .map_or(defaults.initial_backoff, Duration::from_millis),
            max_backoff: var("HOARD_MAX_BACKOFF_SECS")
                .map_or(defaults.max_backoff, Duration::from_secs),
            multiplier: var("HOARD_BACKOFF_MULTIPLIER").unwrap_or(defaults.multiplier),
            jitter: var("HOARD_RETRY_JITTER").unwrap_or(defaults.jitter),
        }
    }

    /// Execute a function with retry logic
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.should_retry() || attempt >= self.max_attempts => {
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!("Attempt {} failed: {}", attempt, e);

                    let mut delay = e.retry_after_hint().unwrap_or(backoff).min(self.max_backoff);
                    if self.jitter {
                        let jitter = rng().random_range(0.0..0.3);
                        #[allow(clippy::cast_precision_loss)]
                        let jitter_ms = (delay.as_millis() as f64 * jitter) as u64;
                        delay += Duration::from_millis(jitter_ms);
                    }

                    tokio::time::sleep(delay).await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use reqwest::StatusCode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(10));
        assert!((policy.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(policy.jitter);
        assert_eq!(RetryPolicy::none().max_attempts, 0);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = fast_policy(3)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProtocolError::Timeout)
                    } else {
                        Ok::<_, ProtocolError>(42)
                    }
                }
            })
            .await;

        assert_eq!(result.expect("retry succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = fast_policy(3)
            .execute(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ProtocolError::HttpStatus(StatusCode::NOT_FOUND)) }
            })
            .await;

        assert!(matches!(result, Err(ProtocolError::HttpStatus(StatusCode::NOT_FOUND))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = fast_policy(2)
            .execute(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ProtocolError::ServiceUnavailable) }
            })
            .await;

        assert!(matches!(result, Err(ProtocolError::ServiceUnavailable)));
        // Initial attempt plus two retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_backoff_progression() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(25),
            multiplier: 2.0,
            jitter: false,
        };

        let start = Instant::now();
        let _ = policy
            .execute(|| async { Err::<(), _>(ProtocolError::Timeout) })
            .await;

        // 10ms + 20ms + 25ms (capped)
        assert!(start.elapsed() >= Duration::from_millis(55));
    }
}
