//! match-crawler: a quota-aware ranked match ingester
//!
//! This crate discovers ranked matches from a rate-limited game-data API and
//! stores the raw match and timeline payloads in blob storage. Discovery
//! (seeding) and fetching (draining) are coordinated through a durable SQLite
//! work ledger so several worker processes can share one queue.

pub mod api;
pub mod blob;
pub mod config;
pub mod crawler;
pub mod ledger;
pub mod limiter;
pub mod metrics;
pub mod output;
pub mod routing;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Blob store error: {0}")]
    Blob(#[from] blob::BlobError),

    #[error("No routing region known for platform '{0}'")]
    UnknownPlatform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Whether upstream rejected the credentials; such errors end the run
    pub fn is_fatal_auth(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, ProcessOutcome};
pub use ledger::{QueueItem, QueueStatus, SqliteLedger, WorkLedger};
pub use limiter::RateLimiter;
pub use metrics::Metrics;
pub use routing::RoutingTable;
