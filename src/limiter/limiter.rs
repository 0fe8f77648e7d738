//! Dual-window rate limiter
//!
//! Enforces two ceilings per scope key at once: at most `per_second` requests
//! in any trailing second and at most `per_two_minutes` requests in any
//! trailing 120 seconds. Keys are independent budgets.

use crate::config::RateLimitConfig;
use crate::limiter::window::SlidingWindow;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const SHORT_SPAN: Duration = Duration::from_secs(1);
const LONG_SPAN: Duration = Duration::from_secs(120);

/// Both windows tracked for one scope key
#[derive(Debug, Clone)]
struct KeyWindows {
    short: SlidingWindow,
    long: SlidingWindow,
}

impl KeyWindows {
    fn new(per_second: usize, per_two_minutes: usize) -> Self {
        Self {
            short: SlidingWindow::new(SHORT_SPAN, per_second),
            long: SlidingWindow::new(LONG_SPAN, per_two_minutes),
        }
    }

    /// Records a request if both windows allow it, else returns the wait
    fn try_reserve(&mut self, now: Instant) -> Result<(), Duration> {
        self.short.prune(now);
        self.long.prune(now);

        let wait_short = self.short.time_until_available(now);
        let wait_long = self.long.time_until_available(now);

        match (wait_short, wait_long) {
            (None, None) => {
                self.short.record(now);
                self.long.record(now);
                Ok(())
            }
            (a, b) => Err(a.unwrap_or_default().max(b.unwrap_or_default())),
        }
    }
}

/// Per-key sliding-window rate limiter
///
/// State lives in memory for the life of the process. Limits apply per
/// process; workers sharing one upstream quota must split it between them.
pub struct RateLimiter {
    per_second: usize,
    per_two_minutes: usize,
    windows: Mutex<HashMap<String, KeyWindows>>,
}

impl RateLimiter {
    /// Creates a limiter with the given ceilings
    pub fn new(per_second: u32, per_two_minutes: u32) -> Self {
        Self {
            per_second: per_second.max(1) as usize,
            per_two_minutes: per_two_minutes.max(1) as usize,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a limiter from configuration
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.per_second, config.per_two_minutes)
    }

    /// Key for platform-scoped endpoints (ladder, identity lookups)
    pub fn platform_key(platform: &str) -> String {
        format!("platform:{}", platform.to_lowercase())
    }

    /// Key for routing-scoped endpoints (match ids, matches, timelines)
    pub fn routing_key(region: &str) -> String {
        format!("routing:{}", region.to_lowercase())
    }

    /// Waits until one more request under `key` fits both windows, then
    /// records it
    ///
    /// Each pass sleeps for the longer of the two required waits and
    /// re-checks, since other callers may have taken the freed slot.
    pub async fn acquire(&self, key: &str) {
        loop {
            let wait = match self.try_acquire(key) {
                Ok(()) => return,
                Err(wait) => wait,
            };

            tracing::debug!("Rate limit reached for {}, waiting {:?}", key, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Records a request under `key` if allowed now
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The request was admitted and recorded
    /// * `Err(Duration)` - Time until the tighter window frees a slot
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        windows
            .entry(key.to_string())
            .or_insert_with(|| KeyWindows::new(self.per_second, self.per_two_minutes))
            .try_reserve(now)
    }
}
