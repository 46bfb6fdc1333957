//! Error types for fetch operations

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited")]
    RateLimited {
        /// Duration from the HTTP Retry-After header, if present
        retry_after: Option<Duration>,
    },

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("HTTP status: {0}")]
    HttpStatus(StatusCode),

    #[error("Server error: {0}")]
    ServerError(StatusCode),

    #[error("Timeout")]
    Timeout,

    #[error("No URLs to fetch")]
    NoUrls,

    #[error("All {attempted} URLs failed, last error: {last_error}")]
    AllUrlsFailed {
        /// Number of URLs tried
        attempted: usize,
        /// Error from the final URL
        last_error: Box<ProtocolError>,
    },
}

impl ProtocolError {
    /// Check if error is retryable
    pub fn should_retry(&self) -> bool {
        match self {
            // Transient errors that should be retried
            Self::ServerError(_)
            | Self::RateLimited { .. }
            | Self::ServiceUnavailable
            | Self::Timeout => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus(status) => {
                matches!(
                    status,
                    &StatusCode::TOO_MANY_REQUESTS
                        | &StatusCode::INTERNAL_SERVER_ERROR
                        | &StatusCode::BAD_GATEWAY
                        | &StatusCode::SERVICE_UNAVAILABLE
                        | &StatusCode::GATEWAY_TIMEOUT
                )
            }
            _ => false,
        }
    }

    /// Get the Retry-After hint duration, if this is a rate-limited error with one.
    pub fn retry_after_hint(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
