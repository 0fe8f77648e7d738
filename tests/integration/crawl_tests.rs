//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the upstream API and run the
//! seed and drain cycles end-to-end against a SQLite ledger on disk and a
//! filesystem blob store.

use match_crawler::api::{Tier, RiotClient};
use match_crawler::blob::FsBlobStore;
use match_crawler::config::{
    ApiConfig, Config, CrawlerConfig, LedgerConfig, RateLimitConfig, SeedTarget, StorageConfig,
};
use match_crawler::crawler::{build_crawler, Crawler, ProcessOutcome, RiotCrawler};
use match_crawler::ledger::{QueueStatus, SqliteLedger, WorkLedger};
use match_crawler::output::load_statistics;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        api: ApiConfig {
            key: "integration-key".to_string(),
            base_url: format!("{}/{{host}}", server.uri()),
            timeout_secs: 5,
            ..Default::default()
        },
        rate_limit: RateLimitConfig {
            per_second: 100,
            per_two_minutes: 1000,
        },
        crawler: CrawlerConfig {
            patch_tag: "14.1".to_string(),
            pacing_ms: 0,
            error_cooldown_ms: 10,
            backoff_initial_ms: 50,
            backoff_max_ms: 200,
            ..Default::default()
        },
        ledger: LedgerConfig {
            database_path: dir.path().join("ledger.db").to_string_lossy().into_owned(),
        },
        storage: StorageConfig {
            backend: "fs".to_string(),
            root: dir.path().join("blobs").to_string_lossy().into_owned(),
        },
        routing: HashMap::new(),
        seed: vec![SeedTarget {
            platform: "na1".to_string(),
            tier: Tier::Challenger,
            division: None,
            max_pages: None,
            max_players: None,
        }],
    }
}

/// Mounts a challenger ladder of two players with overlapping match lists
async fn mount_ladder(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/na1/lol/league/v4/challengerleagues/by-queue/RANKED_SOLO_5x5"))
        .and(header("X-Riot-Token", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tier": "CHALLENGER",
            "queue": "RANKED_SOLO_5x5",
            "entries": [
                {"puuid": "puuid-a", "rank": "I", "leaguePoints": 1500},
                {"summonerId": "summ-b", "rank": "I", "leaguePoints": 1400}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/na1/lol/summoner/v4/summoners/summ-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "summ-b",
            "puuid": "puuid-b"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/americas/lol/match/v5/matches/by-puuid/puuid-a/ids"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!(["NA1_1", "NA1_2"])),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/americas/lol/match/v5/matches/by-puuid/puuid-b/ids"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!(["NA1_2", "NA1_3"])),
        )
        .mount(server)
        .await;
}

/// Mounts match and timeline endpoints answering for any NA1 match
async fn mount_payloads(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/americas/lol/match/v5/matches/NA1_\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": {"dataVersion": "2"},
            "info": {"queueId": 420, "gameVersion": "14.1.555.1234"}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/americas/lol/match/v5/matches/NA1_\d+/timeline$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": {"dataVersion": "2"},
            "info": {"frameInterval": 60000, "frames": []}
        })))
        .mount(server)
        .await;
}

async fn count_requests(server: &MockServer, path_suffix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().ends_with(path_suffix))
        .count()
}

fn open_ledger(config: &Config) -> SqliteLedger {
    SqliteLedger::new(Path::new(&config.ledger.database_path)).unwrap()
}

#[tokio::test]
async fn test_seed_then_drain_stores_payloads() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_ladder(&server).await;
    mount_payloads(&server).await;

    let config = create_test_config(&server, &dir);
    let targets = config.seed.clone();
    let crawler = build_crawler(config.clone()).unwrap();

    let report = crawler.seed(&targets).await.unwrap();
    assert_eq!(report.players, 2);
    assert_eq!(report.enqueued, 3);

    let processed = crawler.drain(100).await.unwrap();
    assert_eq!(processed, 3);

    let blobs = dir.path().join("blobs/raw/14.1/americas");
    for id in ["NA1_1", "NA1_2", "NA1_3"] {
        assert!(blobs.join(format!("matches/{}.json", id)).exists());
        assert!(blobs.join(format!("timelines/{}.json", id)).exists());
    }
    let stored = std::fs::read_to_string(blobs.join("matches/NA1_2.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["info"]["queueId"], 420);

    let stats = load_statistics(&open_ledger(&config)).unwrap();
    assert_eq!(stats.done, 3);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.processing, 0);
    assert_eq!(stats.seen, 3);

    let snap = crawler.metrics().snapshot();
    assert_eq!(snap.processed["americas"], 3);
    assert_eq!(snap.enqueued["americas"], 3);
}

#[tokio::test]
async fn test_overlapping_seed_runs_never_refetch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_ladder(&server).await;
    mount_payloads(&server).await;

    let config = create_test_config(&server, &dir);
    let targets = config.seed.clone();
    let crawler = build_crawler(config).unwrap();

    crawler.seed(&targets).await.unwrap();
    crawler.drain(100).await.unwrap();

    let second = crawler.seed(&targets).await.unwrap();
    assert_eq!(second.enqueued, 0);
    assert_eq!(crawler.drain(100).await.unwrap(), 0);

    assert_eq!(count_requests(&server, "/NA1_2").await, 1);
    assert_eq!(count_requests(&server, "/NA1_2/timeline").await, 1);
}

#[tokio::test]
async fn test_retry_after_then_success() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/americas/lol/match/v5/matches/NA1_42"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_payloads(&server).await;

    let config = create_test_config(&server, &dir);
    let crawler = build_crawler(config.clone()).unwrap();
    crawler
        .with_ledger(|l| l.enqueue("americas", &["NA1_42".to_string()]))
        .unwrap();

    let start = Instant::now();
    let outcome = crawler.process_one().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome, ProcessOutcome::Stored);
    assert!(elapsed >= Duration::from_secs(1), "elapsed {:?}", elapsed);
    assert_eq!(count_requests(&server, "/NA1_42").await, 2);
    assert_eq!(count_requests(&server, "/NA1_42/timeline").await, 1);

    let snap = crawler.metrics().snapshot();
    assert_eq!(snap.total_rate_limited(), 1);
}

#[tokio::test]
async fn test_forbidden_aborts_and_leaves_item_processing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/americas/lol/match/v5/matches/NA1_7"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "status": {"message": "Forbidden", "status_code": 403}
        })))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir);
    let crawler = build_crawler(config.clone()).unwrap();
    crawler
        .with_ledger(|l| l.enqueue("americas", &["NA1_7".to_string(), "NA1_8".to_string()]))
        .unwrap();

    let err = crawler.drain(100).await.unwrap_err();
    assert!(err.is_fatal_auth());

    let ledger = open_ledger(&config);
    assert_eq!(ledger.get_item(1).unwrap().status, QueueStatus::Processing);
    assert_eq!(ledger.get_item(2).unwrap().status, QueueStatus::Queued);
    assert_eq!(count_requests(&server, "/NA1_7").await, 1);
}

#[tokio::test]
async fn test_server_error_fails_item_and_moves_on() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/americas/lol/match/v5/matches/NA1_500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_payloads(&server).await;

    let config = create_test_config(&server, &dir);
    let crawler = build_crawler(config.clone()).unwrap();
    crawler
        .with_ledger(|l| l.enqueue("americas", &["NA1_500".to_string(), "NA1_501".to_string()]))
        .unwrap();

    assert_eq!(crawler.process_one().await.unwrap(), ProcessOutcome::Failed);
    assert_eq!(crawler.process_one().await.unwrap(), ProcessOutcome::Stored);
    assert_eq!(crawler.process_one().await.unwrap(), ProcessOutcome::Empty);

    let stats = load_statistics(&open_ledger(&config)).unwrap();
    assert_eq!(stats.processing, 1);
    assert_eq!(stats.done, 1);
}

#[tokio::test]
async fn test_two_workers_share_one_ledger() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_payloads(&server).await;

    let config = create_test_config(&server, &dir);
    let ids: Vec<String> = (1..=20).map(|i| format!("NA1_{}", i)).collect();
    open_ledger(&config).enqueue("americas", &ids).unwrap();

    let worker = |config: Config| -> RiotCrawler {
        let api = RiotClient::new(&config.api).unwrap();
        let blob = FsBlobStore::new(&config.storage.root);
        Crawler::new(config, api, blob).unwrap()
    };
    let a = worker(config.clone());
    let b = worker(config.clone());

    let (done_a, done_b) = tokio::join!(a.drain(100), b.drain(100));
    assert_eq!(done_a.unwrap() + done_b.unwrap(), 20);

    for id in &ids {
        assert_eq!(count_requests(&server, &format!("/{}", id)).await, 1, "{}", id);
    }
    let stats = load_statistics(&open_ledger(&config)).unwrap();
    assert_eq!(stats.done, 20);
    assert_eq!(stats.seen, 20);
}
