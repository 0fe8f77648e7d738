//! Upstream API error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Errors returned by `GameApi` calls
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rate limited or temporarily unavailable (429/503/504); safe to retry
    #[error("Transient upstream error (HTTP {status})")]
    Transient {
        status: u16,
        /// Server-provided Retry-After hint
        retry_after: Option<Duration>,
    },

    /// Rejected credentials (401/403); never retried
    #[error("Upstream rejected credentials (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Unexpected HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error came from an HTTP 429
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Transient { status: 429, .. })
    }

    /// Server-provided wait before retrying, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;
