//! Crawl metrics
//!
//! Request rates per (scope, key, endpoint) over 1 s and 120 s windows,
//! 429 and error counters, enqueued/processed totals per routing region and
//! a queue-size gauge. A background reporter logs the summary periodically;
//! it is the operator's view of worker health.

mod collector;
mod reporter;

pub use collector::{EndpointRates, Metrics, MetricsSnapshot, Scope, WINDOW_LONG, WINDOW_SHORT};
pub use reporter::ReporterHandle;
