//! Upstream game-data API
//!
//! This module defines the typed surface the crawler talks to:
//! - Ladder tiers and divisions
//! - Ladder entries, player references and identities
//! - The `GameApi` trait and its reqwest implementation `RiotClient`
//!
//! Implementations issue exactly one upstream request per call. Retrying
//! transient failures is the caller's job (see `crawler::retry`).

mod error;
mod riot;

pub use error::{ApiError, ApiResult};
pub use riot::RiotClient;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Ranked ladder tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    Master,
    Grandmaster,
    Challenger,
}

impl Tier {
    /// Apex tiers are served as one league document rather than paged entries
    pub fn is_apex(&self) -> bool {
        matches!(self, Self::Master | Self::Grandmaster | Self::Challenger)
    }

    /// Upper-case name as used in league endpoint paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iron => "IRON",
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
            Self::Emerald => "EMERALD",
            Self::Diamond => "DIAMOND",
            Self::Master => "MASTER",
            Self::Grandmaster => "GRANDMASTER",
            Self::Challenger => "CHALLENGER",
        }
    }

    /// Path segment of the apex league endpoint, `None` for paged tiers
    pub fn apex_segment(&self) -> Option<&'static str> {
        match self {
            Self::Master => Some("masterleagues"),
            Self::Grandmaster => Some("grandmasterleagues"),
            Self::Challenger => Some("challengerleagues"),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Division within a paged tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum Division {
    #[default]
    I,
    II,
    III,
    IV,
}

impl Division {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::IV => "IV",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a ladder listing
///
/// Every field is optional: older payloads carry summoner ids or names
/// instead of a puuid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LadderEntry {
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub summoner_id: Option<String>,
    #[serde(default)]
    pub summoner_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
}

impl LadderEntry {
    /// Key used to dedupe entries within one seeding run
    ///
    /// Returns `None` when the entry names no player at all.
    pub fn dedup_key(&self) -> Option<String> {
        if let Some(puuid) = non_empty(&self.puuid) {
            return Some(format!("puuid:{}", puuid));
        }
        if let Some(id) = non_empty(&self.summoner_id) {
            return Some(format!("id:{}", id));
        }
        non_empty(&self.summoner_name).map(|name| format!("name:{}", name.to_lowercase()))
    }

    /// Lookup reference for entries without a puuid, preferring the id
    pub fn player_ref(&self) -> Option<PlayerRef> {
        if let Some(id) = non_empty(&self.summoner_id) {
            return Some(PlayerRef::SummonerId(id.to_string()));
        }
        non_empty(&self.summoner_name).map(|name| PlayerRef::SummonerName(name.to_string()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Reference to a player that still needs resolving to a puuid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRef {
    SummonerId(String),
    SummonerName(String),
}

/// Stable player identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub puuid: String,
}

/// Query parameters for a match id listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchIdFilter {
    pub queue: Option<u32>,
    pub start: u32,
    pub count: u32,
    /// Epoch seconds, inclusive lower bound
    pub start_time: Option<i64>,
    /// Epoch seconds, upper bound
    pub end_time: Option<i64>,
    /// Match type, e.g. "ranked"
    pub kind: Option<String>,
}

impl Default for MatchIdFilter {
    fn default() -> Self {
        Self {
            queue: None,
            start: 0,
            count: 20,
            start_time: None,
            end_time: None,
            kind: Some("ranked".to_string()),
        }
    }
}

impl MatchIdFilter {
    /// Query string pairs in upstream parameter names
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(queue) = self.queue {
            pairs.push(("queue", queue.to_string()));
        }
        pairs.push(("start", self.start.to_string()));
        pairs.push(("count", self.count.to_string()));
        if let Some(t) = self.start_time {
            pairs.push(("startTime", t.to_string()));
        }
        if let Some(t) = self.end_time {
            pairs.push(("endTime", t.to_string()));
        }
        if let Some(kind) = &self.kind {
            pairs.push(("type", kind.clone()));
        }
        pairs
    }
}

/// Game-data API used by the crawler
///
/// `platform` arguments are platform hosts ("na1"), `routing` arguments are
/// routing regions ("americas").
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Lists ladder entries
    ///
    /// Apex tiers ignore `division` and `page` and return the whole league.
    async fn list_ladder_entries(
        &self,
        platform: &str,
        queue: &str,
        tier: Tier,
        division: Option<Division>,
        page: u32,
    ) -> ApiResult<Vec<LadderEntry>>;

    /// Resolves a summoner reference to a puuid
    async fn resolve_identity(&self, platform: &str, player: &PlayerRef) -> ApiResult<Identity>;

    /// Lists recent match ids for a player, newest first
    async fn list_recent_match_ids(
        &self,
        routing: &str,
        puuid: &str,
        filter: &MatchIdFilter,
    ) -> ApiResult<Vec<String>>;

    async fn fetch_match(&self, routing: &str, match_id: &str) -> ApiResult<serde_json::Value>;

    async fn fetch_timeline(&self, routing: &str, match_id: &str)
        -> ApiResult<serde_json::Value>;
}
