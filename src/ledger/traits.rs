//! Ledger trait and error types

use crate::ledger::{QueueItem, QueueStatus};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Queue item not found: {0}")]
    ItemNotFound(i64),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Durable queue + seen-set used by seeding and draining
///
/// Exclusivity between workers comes from `claim_next` alone: each worker
/// holds its own connection and the claim is a single atomic update.
pub trait WorkLedger {
    /// Inserts each match id not already present
    ///
    /// # Returns
    ///
    /// The number of genuinely new rows
    fn enqueue(&mut self, region: &str, match_ids: &[String]) -> LedgerResult<usize>;

    /// Whether the match's payloads have already been stored
    fn seen(&self, match_id: &str) -> LedgerResult<bool>;

    /// Atomically moves the oldest queued item to `processing` and returns it
    fn claim_next(&mut self) -> LedgerResult<Option<QueueItem>>;

    /// Adds the match to the seen-set (idempotent)
    fn mark_seen(&mut self, match_id: &str, region: &str) -> LedgerResult<()>;

    /// Moves an item to its terminal `done` state
    fn mark_done(&mut self, item_id: i64) -> LedgerResult<()>;

    /// Returns items stuck in `processing` longer than `older_than` to the
    /// queue
    fn requeue_stale(&mut self, older_than: Duration) -> LedgerResult<usize>;

    /// Gets an item by id
    fn get_item(&self, item_id: i64) -> LedgerResult<QueueItem>;

    /// Number of items waiting to be claimed
    fn queue_size(&self) -> LedgerResult<u64>;

    fn count_by_status(&self, status: QueueStatus) -> LedgerResult<u64>;

    fn count_seen(&self) -> LedgerResult<u64>;

    /// Number of queued items per routing region
    fn queued_by_region(&self) -> LedgerResult<Vec<(String, u64)>>;
}
