//! In-memory collaborators for crawler unit tests

use crate::api::{
    ApiError, ApiResult, Division, GameApi, Identity, LadderEntry, MatchIdFilter, PlayerRef, Tier,
};
use crate::blob::{blob_key, BlobError, BlobResult, BlobStore, PayloadKind};
use crate::config::{ApiConfig, Config, CrawlerConfig, LedgerConfig, RateLimitConfig, StorageConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scripted `GameApi` that logs every call
///
/// Match and timeline fetches pop scripted responses per match id and fall
/// back to a small JSON document once the script is exhausted.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<String>>,
    /// (platform, page) -> entries
    pub ladder: Mutex<HashMap<(String, u32), Vec<LadderEntry>>>,
    pub ladder_errors: Mutex<HashMap<(String, u32), ApiError>>,
    /// summoner id or name -> puuid
    pub identities: Mutex<HashMap<String, String>>,
    /// puuid -> match ids
    pub match_ids: Mutex<HashMap<String, Vec<String>>>,
    pub match_script: Mutex<HashMap<String, VecDeque<ApiResult<Value>>>>,
    pub timeline_script: Mutex<HashMap<String, VecDeque<ApiResult<Value>>>>,
    pub last_filter: Mutex<Option<MatchIdFilter>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn set_ladder(&self, platform: &str, page: u32, entries: Vec<LadderEntry>) {
        self.ladder
            .lock()
            .unwrap()
            .insert((platform.to_string(), page), entries);
    }

    pub fn fail_ladder(&self, platform: &str, page: u32, error: ApiError) {
        self.ladder_errors
            .lock()
            .unwrap()
            .insert((platform.to_string(), page), error);
    }

    pub fn set_identity(&self, reference: &str, puuid: &str) {
        self.identities
            .lock()
            .unwrap()
            .insert(reference.to_string(), puuid.to_string());
    }

    pub fn set_match_ids(&self, puuid: &str, ids: &[&str]) {
        self.match_ids.lock().unwrap().insert(
            puuid.to_string(),
            ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn script_match(&self, match_id: &str, response: ApiResult<Value>) {
        self.match_script
            .lock()
            .unwrap()
            .entry(match_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn script_timeline(&self, match_id: &str, response: ApiResult<Value>) {
        self.timeline_script
            .lock()
            .unwrap()
            .entry(match_id.to_string())
            .or_default()
            .push_back(response);
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn entry_with_puuid(puuid: &str) -> LadderEntry {
    LadderEntry {
        puuid: Some(puuid.to_string()),
        ..Default::default()
    }
}

pub fn entry_with_summoner_id(id: &str) -> LadderEntry {
    LadderEntry {
        summoner_id: Some(id.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn list_ladder_entries(
        &self,
        platform: &str,
        _queue: &str,
        tier: Tier,
        _division: Option<Division>,
        page: u32,
    ) -> ApiResult<Vec<LadderEntry>> {
        self.log(format!("ladder:{}:{}:{}", platform, tier, page));
        if let Some(error) = self
            .ladder_errors
            .lock()
            .unwrap()
            .remove(&(platform.to_string(), page))
        {
            return Err(error);
        }
        Ok(self
            .ladder
            .lock()
            .unwrap()
            .get(&(platform.to_string(), page))
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_identity(&self, platform: &str, player: &PlayerRef) -> ApiResult<Identity> {
        let reference = match player {
            PlayerRef::SummonerId(id) => id,
            PlayerRef::SummonerName(name) => name,
        };
        self.log(format!("summoner:{}:{}", platform, reference));
        match self.identities.lock().unwrap().get(reference) {
            Some(puuid) => Ok(Identity {
                puuid: puuid.clone(),
            }),
            None => Err(ApiError::NotFound {
                url: format!("/summoners/{}", reference),
            }),
        }
    }

    async fn list_recent_match_ids(
        &self,
        routing: &str,
        puuid: &str,
        filter: &MatchIdFilter,
    ) -> ApiResult<Vec<String>> {
        self.log(format!("ids:{}:{}", routing, puuid));
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        Ok(self
            .match_ids
            .lock()
            .unwrap()
            .get(puuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_match(&self, routing: &str, match_id: &str) -> ApiResult<Value> {
        self.log(format!("match:{}:{}", routing, match_id));
        let scripted = self
            .match_script
            .lock()
            .unwrap()
            .get_mut(match_id)
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| Ok(json!({"metadata": {"matchId": match_id}})))
    }

    async fn fetch_timeline(&self, routing: &str, match_id: &str) -> ApiResult<Value> {
        self.log(format!("timeline:{}:{}", routing, match_id));
        let scripted = self
            .timeline_script
            .lock()
            .unwrap()
            .get_mut(match_id)
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| Ok(json!({"metadata": {"matchId": match_id}, "frames": []})))
    }
}

/// Blob store keeping payloads in a map
#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<HashMap<String, Value>>,
    pub fail_writes: Mutex<bool>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(
        &self,
        patch: &str,
        region: &str,
        match_id: &str,
        kind: PayloadKind,
        payload: &Value,
    ) -> BlobResult<String> {
        if *self.fail_writes.lock().unwrap() {
            return Err(BlobError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        let key = blob_key(patch, region, kind, match_id)?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.clone(), payload.clone());
        Ok(key)
    }
}

/// Config with generous limits and no pacing delays
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            key: "test-key".to_string(),
            ..Default::default()
        },
        rate_limit: RateLimitConfig {
            per_second: 100,
            per_two_minutes: 1000,
        },
        crawler: CrawlerConfig {
            patch_tag: "14.1".to_string(),
            pacing_ms: 0,
            ..Default::default()
        },
        ledger: LedgerConfig {
            database_path: ":memory:".to_string(),
        },
        storage: StorageConfig {
            backend: "fs".to_string(),
            root: "unused".to_string(),
        },
        routing: HashMap::new(),
        seed: Vec::new(),
    }
}
