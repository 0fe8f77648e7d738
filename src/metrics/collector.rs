//! Sliding-window request counters and lifetime totals

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Short rate window
pub const WINDOW_SHORT: Duration = Duration::from_secs(1);

/// Long rate window, also the retention of request instants
pub const WINDOW_LONG: Duration = Duration::from_secs(120);

/// Which kind of host a request was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Platform host such as "na1"
    Platform,
    /// Routing region such as "americas"
    Routing,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Routing => "routing",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct EndpointKey {
    scope: Scope,
    key: String,
    endpoint: String,
}

impl EndpointKey {
    fn new(scope: Scope, key: &str, endpoint: &str) -> Self {
        Self {
            scope,
            key: key.to_lowercase(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct EndpointStats {
    recent: VecDeque<Instant>,
    requests: u64,
    rate_limited: u64,
    errors: u64,
}

#[derive(Debug, Default)]
struct MetricsState {
    endpoints: HashMap<EndpointKey, EndpointStats>,
    enqueued: BTreeMap<String, u64>,
    processed: BTreeMap<String, u64>,
    queue_size: Option<u64>,
}

/// Rates and totals for one (scope, key, endpoint) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRates {
    pub scope: Scope,
    pub key: String,
    pub endpoint: String,
    /// Requests within the last second
    pub last_second: usize,
    /// Requests within the last 120 seconds
    pub last_two_minutes: usize,
    pub requests: u64,
    pub rate_limited: u64,
    pub errors: u64,
}

/// Point-in-time copy of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_size: Option<u64>,
    /// Sorted by scope, key, endpoint
    pub endpoints: Vec<EndpointRates>,
    pub enqueued: BTreeMap<String, u64>,
    pub processed: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn total_requests(&self) -> u64 {
        self.endpoints.iter().map(|e| e.requests).sum()
    }

    pub fn total_rate_limited(&self) -> u64 {
        self.endpoints.iter().map(|e| e.rate_limited).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.endpoints.iter().map(|e| e.errors).sum()
    }

    /// Human-readable pacing summary
    ///
    /// ```text
    /// === pacing ===
    /// queue_size=42
    /// routing:americas ->  2/s, 0.05/s (120s window)
    ///   - match     1/s, 0.03/s (120s)
    ///   - timeline  1/s, 0.02/s (120s)
    /// enqueued::americas=50
    /// processed::americas=3
    /// ```
    pub fn render(&self) -> String {
        let mut lines = vec!["=== pacing ===".to_string()];
        if let Some(size) = self.queue_size {
            lines.push(format!("queue_size={}", size));
        }

        let mut by_scope_key: BTreeMap<(Scope, &str), Vec<&EndpointRates>> = BTreeMap::new();
        for rates in &self.endpoints {
            by_scope_key
                .entry((rates.scope, rates.key.as_str()))
                .or_default()
                .push(rates);
        }

        let long_secs = WINDOW_LONG.as_secs_f64();
        for ((scope, key), endpoints) in by_scope_key {
            let short: usize = endpoints.iter().map(|e| e.last_second).sum();
            let long: usize = endpoints.iter().map(|e| e.last_two_minutes).sum();
            lines.push(format!(
                "{}:{} -> {:2}/s, {:.2}/s (120s window)",
                scope,
                key,
                short,
                long as f64 / long_secs
            ));
            for e in endpoints {
                lines.push(format!(
                    "  - {:<8} {:2}/s, {:.2}/s (120s)",
                    e.endpoint,
                    e.last_second,
                    e.last_two_minutes as f64 / long_secs
                ));
            }
        }

        let mut totals: Vec<(String, u64)> = Vec::new();
        for (region, n) in &self.enqueued {
            totals.push((format!("enqueued::{}", region), *n));
        }
        for (region, n) in &self.processed {
            totals.push((format!("processed::{}", region), *n));
        }
        for e in &self.endpoints {
            if e.rate_limited > 0 {
                totals.push((
                    format!("429::{}::{}::{}", e.scope, e.key, e.endpoint),
                    e.rate_limited,
                ));
            }
            if e.errors > 0 {
                totals.push((format!("err::{}::{}::{}", e.scope, e.key, e.endpoint), e.errors));
            }
        }
        totals.sort();
        lines.extend(totals.into_iter().map(|(k, v)| format!("{}={}", k, v)));

        lines.join("\n")
    }
}

/// Thread-safe crawl metrics
///
/// All recorders take one short-held lock. Request instants are kept for
/// 120 s; counters live for the process lifetime.
#[derive(Debug, Default)]
pub struct Metrics {
    state: Mutex<MetricsState>,
    pub(super) reporter_running: AtomicBool,
    pub(super) reports_emitted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MetricsState) -> R) -> R {
        // Counters stay usable even if a recorder panicked mid-update
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Records one upstream request
    pub fn record_request(&self, scope: Scope, key: &str, endpoint: &str) {
        let now = Instant::now();
        self.with_state(|state| {
            let stats = state
                .endpoints
                .entry(EndpointKey::new(scope, key, endpoint))
                .or_default();
            stats.recent.push_back(now);
            stats.requests += 1;
        });
    }

    /// Records an HTTP 429 response
    pub fn record_429(&self, scope: Scope, key: &str, endpoint: &str) {
        self.with_state(|state| {
            state
                .endpoints
                .entry(EndpointKey::new(scope, key, endpoint))
                .or_default()
                .rate_limited += 1;
        });
    }

    /// Records a failed request or item
    pub fn record_error(&self, scope: Scope, key: &str, endpoint: &str) {
        self.with_state(|state| {
            state
                .endpoints
                .entry(EndpointKey::new(scope, key, endpoint))
                .or_default()
                .errors += 1;
        });
    }

    pub fn record_enqueued(&self, routing: &str, n: u64) {
        self.with_state(|state| {
            *state.enqueued.entry(routing.to_lowercase()).or_default() += n;
        });
    }

    pub fn record_processed(&self, routing: &str, n: u64) {
        self.with_state(|state| {
            *state.processed.entry(routing.to_lowercase()).or_default() += n;
        });
    }

    pub fn set_queue_size(&self, n: u64) {
        self.with_state(|state| state.queue_size = Some(n));
    }

    /// Prunes old request instants and copies out current rates and totals
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Instant::now();
        self.with_state(|state| {
            let mut endpoints: Vec<EndpointRates> = state
                .endpoints
                .iter_mut()
                .map(|(key, stats)| {
                    while let Some(&oldest) = stats.recent.front() {
                        if now.saturating_duration_since(oldest) >= WINDOW_LONG {
                            stats.recent.pop_front();
                        } else {
                            break;
                        }
                    }
                    let last_second = stats
                        .recent
                        .iter()
                        .rev()
                        .take_while(|&&t| now.saturating_duration_since(t) < WINDOW_SHORT)
                        .count();
                    EndpointRates {
                        scope: key.scope,
                        key: key.key.clone(),
                        endpoint: key.endpoint.clone(),
                        last_second,
                        last_two_minutes: stats.recent.len(),
                        requests: stats.requests,
                        rate_limited: stats.rate_limited,
                        errors: stats.errors,
                    }
                })
                .collect();
            endpoints.sort_by(|a, b| {
                (a.scope, &a.key, &a.endpoint).cmp(&(b.scope, &b.key, &b.endpoint))
            });

            MetricsSnapshot {
                queue_size: state.queue_size,
                endpoints,
                enqueued: state.enqueued.clone(),
                processed: state.processed.clone(),
            }
        })
    }

    /// Renders the current summary text
    pub fn render_summary(&self) -> String {
        self.snapshot().render()
    }

    /// Number of summaries logged by the background reporter
    pub fn reports_emitted(&self) -> u64 {
        self.reports_emitted.load(Ordering::Relaxed)
    }
}
