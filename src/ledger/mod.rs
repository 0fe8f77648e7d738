//! Durable work ledger
//!
//! This module handles the match fetch queue and the seen-set:
//! - FIFO queue of match ids keyed by routing region
//! - Atomic claim of the oldest queued item
//! - Dedup of matches whose payloads are already stored
//! - Completion tracking (rows are kept as an audit trail)

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteLedger;
pub use traits::{LedgerError, LedgerResult, WorkLedger};

/// Lifecycle state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    /// Waiting to be claimed
    Queued,

    /// Claimed by a worker
    Processing,

    /// Finished (stored, skipped as seen, or missing upstream)
    Done,
}

impl QueueStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// A match fetch work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: i64,
    pub match_id: String,
    /// Routing region, so a restarted worker can target the right host
    pub region: String,
    pub status: QueueStatus,
    pub enqueued_at: String,
    pub picked_at: Option<String>,
    pub done_at: Option<String>,
}
