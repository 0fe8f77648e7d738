use crate::api::{Division, Tier};
use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
    /// Extra or overriding platform -> routing region entries
    #[serde(default)]
    pub routing: HashMap<String, String>,
    #[serde(default)]
    pub seed: Vec<SeedTarget>,
}

/// Upstream API access
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API credential; usually supplied through `RIOT_API_KEY`
    #[serde(default)]
    pub key: String,

    /// Base URL template, `{host}` is replaced by the platform or routing host
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Request ceilings enforced per scope key.
///
/// These are per process. When several workers share one API key, divide the
/// upstream quota by the number of workers.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(rename = "per-second", default = "default_per_second")]
    pub per_second: u32,

    #[serde(rename = "per-two-minutes", default = "default_per_two_minutes")]
    pub per_two_minutes: u32,
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Patch tag used in blob keys
    #[serde(rename = "patch-tag", default = "default_patch_tag")]
    pub patch_tag: String,

    /// Queue id filter for match id listings (420 = ranked solo)
    #[serde(rename = "queue-id", default = "default_queue_id")]
    pub queue_id: u32,

    /// Ladder queue name for league endpoints
    #[serde(rename = "ladder-queue", default = "default_ladder_queue")]
    pub ladder_queue: String,

    /// Match ids requested per player while seeding
    #[serde(rename = "matches-per-player", default = "default_matches_per_player")]
    pub matches_per_player: u32,

    /// Only list matches newer than this many days (unset = no bound)
    #[serde(rename = "lookback-days", default)]
    pub lookback_days: Option<u32>,

    /// Delay after each stored match (milliseconds)
    #[serde(rename = "pacing-ms", default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Delay after a failed item (milliseconds)
    #[serde(rename = "error-cooldown-ms", default = "default_error_cooldown_ms")]
    pub error_cooldown_ms: u64,

    /// First backoff step for transient upstream errors (milliseconds)
    #[serde(rename = "backoff-initial-ms", default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Backoff ceiling for transient upstream errors (milliseconds)
    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Idle sleep when the queue is empty (seconds)
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Metrics summary interval (seconds)
    #[serde(rename = "report-interval-secs", default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Requeue `processing` items claimed longer ago than this (unset = never)
    #[serde(rename = "lease-timeout-secs", default)]
    pub lease_timeout_secs: Option<u64>,
}

/// Work ledger location
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Blob storage backend
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend selector; only "fs" is built in
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Root directory for the filesystem backend
    pub root: String,
}

/// One ladder slice to seed from
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTarget {
    /// Platform host, e.g. "na1"
    pub platform: String,

    pub tier: Tier,

    /// Ignored for apex tiers; defaults to I for paged tiers
    #[serde(default)]
    pub division: Option<Division>,

    /// Page cap for paged tiers (unset = until an empty page)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Stop after this many distinct players
    #[serde(rename = "max-players", default)]
    pub max_players: Option<usize>,
}

fn default_base_url() -> String {
    "https://{host}.api.riotgames.com".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("match-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_per_second() -> u32 {
    20
}

fn default_per_two_minutes() -> u32 {
    100
}

fn default_patch_tag() -> String {
    "dev".to_string()
}

fn default_queue_id() -> u32 {
    420
}

fn default_ladder_queue() -> String {
    "RANKED_SOLO_5x5".to_string()
}

fn default_matches_per_player() -> u32 {
    50
}

fn default_pacing_ms() -> u64 {
    150
}

fn default_error_cooldown_ms() -> u64 {
    1000
}

fn default_backoff_initial_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    16_000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_report_interval_secs() -> u64 {
    10
}

fn default_backend() -> String {
    "fs".to_string()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            per_two_minutes: default_per_two_minutes(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            patch_tag: default_patch_tag(),
            queue_id: default_queue_id(),
            ladder_queue: default_ladder_queue(),
            matches_per_player: default_matches_per_player(),
            lookback_days: None,
            pacing_ms: default_pacing_ms(),
            error_cooldown_ms: default_error_cooldown_ms(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            report_interval_secs: default_report_interval_secs(),
            lease_timeout_secs: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}
