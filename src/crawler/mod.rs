//! Crawler module for match discovery and ingestion
//!
//! This module contains the core crawl logic, including:
//! - Rate-limited, retrying upstream calls
//! - Seeding the queue from ladder slices
//! - Draining the queue into blob storage
//! - The long-running worker loop

mod coordinator;
mod retry;
mod seeder;

#[cfg(test)]
mod fake;

pub use coordinator::{Crawler, ProcessOutcome};
pub use retry::{gated_call, BackoffPolicy, CallSite};
pub use seeder::SeedReport;

use crate::api::RiotClient;
use crate::blob::FsBlobStore;
use crate::config::Config;
use crate::Result;

/// Production crawler: Riot HTTP client and filesystem blob store
pub type RiotCrawler = Crawler<RiotClient, FsBlobStore>;

/// Builds the production crawler from a validated configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(RiotCrawler)` - Crawler with its ledger open
/// * `Err(CrawlError)` - Missing API key, HTTP client or ledger failure
pub fn build_crawler(config: Config) -> Result<RiotCrawler> {
    let api = RiotClient::new(&config.api)?;
    let blob = FsBlobStore::new(&config.storage.root);
    Crawler::new(config, api, blob)
}
