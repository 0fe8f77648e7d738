//! Sliding request window
//!
//! A window remembers the instants of recent requests and answers whether one
//! more request fits under its limit, or how long until it will.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Request instants within a trailing time span
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    /// Length of the trailing window
    span: Duration,

    /// Maximum requests allowed within any span
    limit: usize,

    /// Request instants, oldest first
    stamps: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Creates an empty window
    pub fn new(span: Duration, limit: usize) -> Self {
        Self {
            span,
            limit,
            stamps: VecDeque::with_capacity(limit.min(1024)),
        }
    }

    /// Drops instants that have fallen out of the window
    ///
    /// An instant counts for exactly `span`: at `stamp + span` it expires.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) >= self.span {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until one more request fits, or `None` if it fits now
    ///
    /// Callers should `prune` first.
    pub fn time_until_available(&self, now: Instant) -> Option<Duration> {
        if self.len() < self.limit {
            return None;
        }

        // Saturated: the oldest entry must expire first
        self.stamps
            .front()
            .map(|&oldest| (oldest + self.span).saturating_duration_since(now))
    }

    /// Records a request at `now`
    pub fn record(&mut self, now: Instant) {
        self.stamps.push_back(now);
    }

    /// Number of requests currently inside the window
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}
