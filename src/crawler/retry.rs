//! Rate-limit gating and transient-error retry for upstream calls

use crate::api::ApiResult;
use crate::config::CrawlerConfig;
use crate::limiter::RateLimiter;
use crate::metrics::{Metrics, Scope};
use std::future::Future;
use std::time::Duration;

/// Exponential backoff used when a transient error carries no Retry-After
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.backoff_initial_ms),
            max: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Delay following `current`, doubled and capped
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(16),
        }
    }
}

/// Where an upstream call goes, for limiter keys and metrics labels
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub scope: Scope,
    /// Platform host or routing region
    pub host: &'a str,
    /// Endpoint label, e.g. "match"
    pub endpoint: &'static str,
}

impl<'a> CallSite<'a> {
    pub fn platform(host: &'a str, endpoint: &'static str) -> Self {
        Self {
            scope: Scope::Platform,
            host,
            endpoint,
        }
    }

    pub fn routing(region: &'a str, endpoint: &'static str) -> Self {
        Self {
            scope: Scope::Routing,
            host: region,
            endpoint,
        }
    }

    fn limiter_key(&self) -> String {
        match self.scope {
            Scope::Platform => RateLimiter::platform_key(self.host),
            Scope::Routing => RateLimiter::routing_key(self.host),
        }
    }
}

/// Runs `call` behind the rate limiter, retrying transient failures
///
/// Every attempt acquires a limiter slot and is recorded as a request.
/// Transient errors are counted (as 429s or errors) and retried after the
/// server's Retry-After hint or the next backoff step, without limit. Any
/// other error is returned to the caller; not-found is not counted as an
/// error.
pub async fn gated_call<T, F, Fut>(
    limiter: &RateLimiter,
    metrics: &Metrics,
    backoff: BackoffPolicy,
    site: CallSite<'_>,
    mut call: F,
) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let key = site.limiter_key();
    let mut delay = backoff.initial;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        limiter.acquire(&key).await;
        metrics.record_request(site.scope, site.host, site.endpoint);

        match call().await {
            Err(e) if e.is_transient() => {
                if e.is_rate_limited() {
                    metrics.record_429(site.scope, site.host, site.endpoint);
                } else {
                    metrics.record_error(site.scope, site.host, site.endpoint);
                }

                let wait = match e.retry_after() {
                    Some(hint) => hint,
                    None => {
                        let wait = delay;
                        delay = backoff.next_delay(delay);
                        wait
                    }
                };
                tracing::warn!(
                    "{} from {}:{} {} (attempt {}), retrying in {:?}",
                    e,
                    site.scope,
                    site.host,
                    site.endpoint,
                    attempt,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                if !e.is_not_found() {
                    metrics.record_error(site.scope, site.host, site.endpoint);
                }
                return Err(e);
            }
            Ok(value) => return Ok(value),
        }
    }
}
