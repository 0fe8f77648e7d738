//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, plus the environment overrides operators use in deployments.
//!
//! # Example
//!
//! ```no_run
//! use match_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Ledger at: {}", config.ledger.database_path);
//! ```

mod env;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, CrawlerConfig, LedgerConfig, RateLimitConfig, SeedTarget, StorageConfig,
};

pub use env::apply_env_overrides;
pub use parser::{compute_config_hash, load_config, load_config_with_env, load_config_with_hash};
pub use validation::validate;
