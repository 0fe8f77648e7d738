//! reqwest implementation of `GameApi`

use super::{
    ApiError, ApiResult, Division, GameApi, Identity, LadderEntry, MatchIdFilter, PlayerRef, Tier,
};
use crate::config::ApiConfig;
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Header carrying the API key
const TOKEN_HEADER: &str = "X-Riot-Token";

/// Apex league document; only the entries are used
#[derive(Debug, Deserialize)]
struct LeagueList {
    #[serde(default)]
    entries: Vec<LadderEntry>,
}

/// HTTP client for the Riot game-data API
///
/// One request per call, no retries. Each request carries the configured
/// timeout, the API key header and the configured user agent.
pub struct RiotClient {
    client: Client,
    base_url: String,
}

impl RiotClient {
    /// Builds a client from the `[api]` config section
    ///
    /// # Returns
    ///
    /// * `Ok(RiotClient)` - Client ready to issue requests
    /// * `Err(CrawlError)` - The API key is missing or the client could not be built
    pub fn new(config: &ApiConfig) -> crate::Result<Self> {
        let key = config.key.trim();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "api.key is empty (set RIOT_API_KEY)".to_string(),
            )
            .into());
        }

        let mut token = HeaderValue::from_str(key).map_err(|_| {
            ConfigError::Validation("api.key contains invalid header characters".to_string())
        })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| CrawlError::Api(ApiError::Http(e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Builds the URL for `host` and the given path segments
    ///
    /// Segments are percent-encoded, so summoner names with spaces are safe.
    fn endpoint(&self, host: &str, segments: &[&str]) -> ApiResult<Url> {
        let base = self.base_url.replace("{host}", &host.to_lowercase());
        let mut url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return serde_json::from_slice(&body)
                .map_err(|e| ApiError::Decode(format!("{}: {}", url.path(), e)));
        }

        Err(classify_failure(status, url, response).await)
    }
}

/// Maps a non-success response to an `ApiError`
async fn classify_failure(status: StatusCode, url: Url, response: Response) -> ApiError {
    match status.as_u16() {
        429 | 503 | 504 => ApiError::Transient {
            status: status.as_u16(),
            retry_after: parse_retry_after(response.headers()),
        },
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Auth failure {} on {}: {}", status, url.path(), body);
            ApiError::Auth {
                status: status.as_u16(),
                body,
            }
        }
        404 => ApiError::NotFound {
            url: url.path().to_string(),
        },
        other => ApiError::Status {
            status: other,
            url: url.path().to_string(),
        },
    }
}

/// Reads a Retry-After header given in whole seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl GameApi for RiotClient {
    async fn list_ladder_entries(
        &self,
        platform: &str,
        queue: &str,
        tier: Tier,
        division: Option<Division>,
        page: u32,
    ) -> ApiResult<Vec<LadderEntry>> {
        if let Some(segment) = tier.apex_segment() {
            // Apex leagues come back whole
            if page > 1 {
                return Ok(Vec::new());
            }
            let url = self.endpoint(platform, &["lol", "league", "v4", segment, "by-queue", queue])?;
            let league: LeagueList = self.get_json(url).await?;
            return Ok(league.entries);
        }

        let division = division.unwrap_or_default();
        let mut url = self.endpoint(
            platform,
            &["lol", "league", "v4", "entries", queue, tier.as_str(), division.as_str()],
        )?;
        url.query_pairs_mut()
            .append_pair("page", &page.max(1).to_string());
        self.get_json(url).await
    }

    async fn resolve_identity(&self, platform: &str, player: &PlayerRef) -> ApiResult<Identity> {
        let url = match player {
            PlayerRef::SummonerId(id) => {
                self.endpoint(platform, &["lol", "summoner", "v4", "summoners", id.as_str()])?
            }
            PlayerRef::SummonerName(name) => self.endpoint(
                platform,
                &["lol", "summoner", "v4", "summoners", "by-name", name.as_str()],
            )?,
        };
        self.get_json(url).await
    }

    async fn list_recent_match_ids(
        &self,
        routing: &str,
        puuid: &str,
        filter: &MatchIdFilter,
    ) -> ApiResult<Vec<String>> {
        let mut url = self.endpoint(
            routing,
            &["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"],
        )?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in filter.query_pairs() {
                query.append_pair(name, &value);
            }
        }
        self.get_json(url).await
    }

    async fn fetch_match(&self, routing: &str, match_id: &str) -> ApiResult<serde_json::Value> {
        let url = self.endpoint(routing, &["lol", "match", "v5", "matches", match_id])?;
        self.get_json(url).await
    }

    async fn fetch_timeline(
        &self,
        routing: &str,
        match_id: &str,
    ) -> ApiResult<serde_json::Value> {
        let url = self.endpoint(
            routing,
            &["lol", "match", "v5", "matches", match_id, "timeline"],
        )?;
        self.get_json(url).await
    }
}
