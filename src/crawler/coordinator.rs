//! Crawler coordinator - drain loop orchestration
//!
//! This module owns the shared crawl state and the claim -> fetch -> store ->
//! ack cycle:
//! - Claiming work from the ledger
//! - Short-circuiting matches that are already stored
//! - Fetching match and timeline payloads behind the rate limiter
//! - Persisting payloads and acknowledging the item
//! - The long-running worker loop with shutdown and lease sweeps

use crate::api::{ApiError, GameApi};
use crate::blob::{BlobStore, PayloadKind};
use crate::config::Config;
use crate::crawler::retry::{gated_call, BackoffPolicy, CallSite};
use crate::ledger::{LedgerResult, QueueItem, SqliteLedger, WorkLedger};
use crate::limiter::RateLimiter;
use crate::metrics::{Metrics, Scope};
use crate::routing::RoutingTable;
use crate::{CrawlError, Result};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Result of one `process_one` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Nothing was queued
    Empty,
    /// The match was already stored; acknowledged without any fetch
    AlreadySeen,
    /// Match and timeline stored, item acknowledged
    Stored,
    /// Upstream has no such match; acknowledged without marking it seen
    Missing,
    /// Fetch or store failed; the item stays `processing`
    Failed,
}

impl ProcessOutcome {
    /// Whether an item was claimed
    pub fn had_work(&self) -> bool {
        !matches!(self, Self::Empty)
    }
}

/// Sets the queue-size gauge; a failed count is logged and the gauge kept
fn update_queue_gauge(metrics: &Metrics, size: LedgerResult<u64>) {
    match size {
        Ok(size) => metrics.set_queue_size(size),
        Err(e) => tracing::warn!("Queue size refresh failed: {}", e),
    }
}

/// Main crawler structure
///
/// Holds the ledger connection, the per-process rate limiter and metrics,
/// and the two external collaborators. One `Crawler` is one logical worker.
pub struct Crawler<A: GameApi, B: BlobStore> {
    pub(super) config: Arc<Config>,
    pub(super) ledger: Arc<Mutex<SqliteLedger>>,
    pub(super) limiter: Arc<RateLimiter>,
    pub(super) metrics: Arc<Metrics>,
    pub(super) routing: RoutingTable,
    pub(super) backoff: BackoffPolicy,
    pub(super) api: A,
    pub(super) blob: B,
}

impl<A: GameApi, B: BlobStore> Crawler<A, B> {
    /// Creates a crawler with its own ledger connection, limiter and metrics
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `api` - Upstream API client
    /// * `blob` - Payload storage
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to seed or drain
    /// * `Err(CrawlError)` - The ledger could not be opened
    pub fn new(config: Config, api: A, blob: B) -> Result<Self> {
        let ledger = SqliteLedger::new(Path::new(&config.ledger.database_path))?;
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let metrics = Arc::new(Metrics::new());
        Ok(Self::with_parts(config, ledger, limiter, metrics, api, blob))
    }

    /// Creates a crawler from already-built parts
    pub fn with_parts(
        config: Config,
        ledger: SqliteLedger,
        limiter: Arc<RateLimiter>,
        metrics: Arc<Metrics>,
        api: A,
        blob: B,
    ) -> Self {
        let routing = RoutingTable::with_overrides(&config.routing);
        let backoff = BackoffPolicy::from_config(&config.crawler);
        Self {
            config: Arc::new(config),
            ledger: Arc::new(Mutex::new(ledger)),
            limiter,
            metrics,
            routing,
            backoff,
            api,
            blob,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Runs `f` with exclusive access to the ledger
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut SqliteLedger) -> R) -> R {
        f(&mut self.lock_ledger())
    }

    /// Locks the ledger; the guard must never be held across an await
    pub(super) fn lock_ledger(&self) -> MutexGuard<'_, SqliteLedger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rate-limited, retrying upstream call
    pub(super) async fn gated<T, F, Fut>(&self, site: CallSite<'_>, call: F) -> crate::api::ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = crate::api::ApiResult<T>>,
    {
        gated_call(&self.limiter, &self.metrics, self.backoff, site, call).await
    }

    /// Refreshes the queue-size gauge
    pub(super) fn refresh_queue_size(&self) -> Result<u64> {
        let size = self.lock_ledger().queue_size()?;
        self.metrics.set_queue_size(size);
        Ok(size)
    }

    /// Claims and processes one queue item
    ///
    /// Failures while fetching or storing a claimed item are logged, a
    /// cooldown is applied, and the item is left `processing`. Rejected
    /// credentials abort with `Err`, as does a failure to claim at all.
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessOutcome)` - What happened to the claimed item, or `Empty`
    /// * `Err(CrawlError)` - Fatal error
    pub async fn process_one(&self) -> Result<ProcessOutcome> {
        let item = {
            let mut ledger = self.lock_ledger();
            let item = ledger.claim_next()?;
            update_queue_gauge(&self.metrics, ledger.queue_size());
            item
        };

        let item = match item {
            Some(item) => item,
            None => {
                tracing::debug!("Queue empty");
                return Ok(ProcessOutcome::Empty);
            }
        };

        match self.handle_item(&item).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal_auth() => {
                tracing::error!("Credentials rejected while processing {}: {}", item.match_id, e);
                Err(e)
            }
            Err(e) => {
                tracing::error!("Error on {} (item {}): {}", item.match_id, item.id, e);
                if !matches!(e, CrawlError::Api(_)) {
                    self.metrics
                        .record_error(Scope::Routing, &item.region, "storage");
                }
                tokio::time::sleep(Duration::from_millis(self.config.crawler.error_cooldown_ms))
                    .await;
                Ok(ProcessOutcome::Failed)
            }
        }
    }

    async fn handle_item(&self, item: &QueueItem) -> Result<ProcessOutcome> {
        let match_id = item.match_id.as_str();
        let region = item.region.as_str();

        {
            let mut ledger = self.lock_ledger();
            if ledger.seen(match_id)? {
                ledger.mark_done(item.id)?;
                tracing::info!("Already seen {}, marked done", match_id);
                return Ok(ProcessOutcome::AlreadySeen);
            }
        }

        let api = &self.api;
        let payload = match self
            .gated(CallSite::routing(region, PayloadKind::Match.endpoint()), move || {
                api.fetch_match(region, match_id)
            })
            .await
        {
            Ok(payload) => payload,
            Err(ApiError::NotFound { .. }) => {
                tracing::warn!("Match {} not found upstream, marking done", match_id);
                self.lock_ledger().mark_done(item.id)?;
                return Ok(ProcessOutcome::Missing);
            }
            Err(e) => return Err(e.into()),
        };

        let patch = self.config.crawler.patch_tag.as_str();
        self.blob
            .write(patch, region, match_id, PayloadKind::Match, &payload)
            .await?;

        match self
            .gated(CallSite::routing(region, PayloadKind::Timeline.endpoint()), move || {
                api.fetch_timeline(region, match_id)
            })
            .await
        {
            Ok(timeline) => {
                self.blob
                    .write(patch, region, match_id, PayloadKind::Timeline, &timeline)
                    .await?;
            }
            Err(ApiError::NotFound { .. }) => {
                tracing::warn!("No timeline for {}, keeping match only", match_id);
            }
            Err(e) => return Err(e.into()),
        }

        {
            let mut ledger = self.lock_ledger();
            ledger.mark_seen(match_id, region)?;
            ledger.mark_done(item.id)?;
        }
        self.metrics.record_processed(region, 1);
        tracing::info!("Saved {}", match_id);

        if self.config.crawler.pacing_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.crawler.pacing_ms)).await;
        }

        Ok(ProcessOutcome::Stored)
    }

    /// Processes items until the queue is empty or `max_items` were claimed
    ///
    /// # Returns
    ///
    /// The number of items claimed (whatever their outcome)
    pub async fn drain(&self, max_items: usize) -> Result<usize> {
        let mut processed = 0;
        while processed < max_items {
            if !self.process_one().await?.had_work() {
                break;
            }
            processed += 1;
        }
        tracing::info!("Drain finished: {} items", processed);
        Ok(processed)
    }

    /// Returns items whose lease expired to the queue
    pub fn requeue_stale(&self, older_than: Duration) -> Result<usize> {
        let requeued = self.lock_ledger().requeue_stale(older_than)?;
        if requeued > 0 {
            tracing::warn!("Requeued {} stale processing items", requeued);
        }
        Ok(requeued)
    }

    /// Worker loop: processes items until `shutdown` is set
    ///
    /// Sleeps the poll interval whenever the queue is empty, running the
    /// stale-lease sweep first if one is configured. Only rejected credentials
    /// end the loop early.
    ///
    /// # Returns
    ///
    /// The number of items claimed
    pub async fn run(&self, shutdown: Arc<AtomicBool>) -> Result<usize> {
        let poll = Duration::from_secs(self.config.crawler.poll_interval_secs);
        let cooldown = Duration::from_millis(self.config.crawler.error_cooldown_ms);
        let lease = self.config.crawler.lease_timeout_secs.map(Duration::from_secs);
        let mut processed = 0;

        tracing::info!("Worker started (poll interval {:?})", poll);

        while !shutdown.load(Ordering::SeqCst) {
            match self.process_one().await {
                Ok(ProcessOutcome::Empty) => {
                    if let Some(lease) = lease {
                        if let Err(e) = self.requeue_stale(lease) {
                            tracing::error!("Stale lease sweep failed: {}", e);
                        }
                    }
                    tokio::time::sleep(poll).await;
                }
                Ok(_) => processed += 1,
                Err(e) if e.is_fatal_auth() => return Err(e),
                Err(e) => {
                    tracing::error!("Worker error: {}", e);
                    tokio::time::sleep(cooldown).await;
                }
            }
        }

        tracing::info!("Worker stopping after {} items", processed);
        Ok(processed)
    }
}
