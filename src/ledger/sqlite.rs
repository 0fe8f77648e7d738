//! SQLite work ledger
//!
//! This module provides a SQLite-based implementation of the WorkLedger trait.

use crate::ledger::schema::initialize_schema;
use crate::ledger::traits::{LedgerError, LedgerResult, WorkLedger};
use crate::ledger::{QueueItem, QueueStatus};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on another process's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const ITEM_COLUMNS: &str = "id, match_id, region, status, enqueued_at, picked_at, done_at";

/// SQLite ledger backend
///
/// Each worker process (or thread) opens its own `SqliteLedger` on the same
/// database file.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates a ledger database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteLedger)` - Successfully opened/created database
    /// * `Err(LedgerError)` - Failed to open database
    pub fn new(path: &Path) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for tests and dry runs)
    pub fn new_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Rewrites an item's claim time, simulating a worker that died long ago
    #[cfg(test)]
    pub(crate) fn backdate_picked_at(&mut self, item_id: i64, picked_at: &str) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE match_queue SET picked_at = ?1 WHERE id = ?2",
            rusqlite::params![picked_at, item_id],
        )?;
        Ok(())
    }
}

/// Sortable UTC timestamp with microsecond precision
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<QueueItem> {
    let raw_status: String = row.get(3)?;
    let status = QueueStatus::from_db_string(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown queue status '{}'", raw_status).into(),
        )
    })?;

    Ok(QueueItem {
        id: row.get(0)?,
        match_id: row.get(1)?,
        region: row.get(2)?,
        status,
        enqueued_at: row.get(4)?,
        picked_at: row.get(5)?,
        done_at: row.get(6)?,
    })
}

impl WorkLedger for SqliteLedger {
    // ===== Queue =====

    fn enqueue(&mut self, region: &str, match_ids: &[String]) -> LedgerResult<usize> {
        let now = timestamp_now();
        let tx = self.conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO match_queue (match_id, region, status, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for match_id in match_ids {
                inserted += stmt.execute(params![
                    match_id,
                    region,
                    QueueStatus::Queued.to_db_string(),
                    now
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn claim_next(&mut self) -> LedgerResult<Option<QueueItem>> {
        let now = timestamp_now();

        // IMMEDIATE takes the write lock up front so the select-and-update
        // below cannot interleave with another worker's claim
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let item = tx
            .query_row(
                &format!(
                    "UPDATE match_queue SET status = ?1, picked_at = ?2
                     WHERE id = (
                         SELECT id FROM match_queue
                         WHERE status = ?3
                         ORDER BY enqueued_at ASC, id ASC
                         LIMIT 1
                     )
                     AND status = ?3
                     RETURNING {}",
                    ITEM_COLUMNS
                ),
                params![
                    QueueStatus::Processing.to_db_string(),
                    now,
                    QueueStatus::Queued.to_db_string()
                ],
                row_to_item,
            )
            .optional()?;

        tx.commit()?;
        Ok(item)
    }

    fn mark_done(&mut self, item_id: i64) -> LedgerResult<()> {
        let updated = self.conn.execute(
            "UPDATE match_queue SET status = ?1, done_at = ?2 WHERE id = ?3",
            params![QueueStatus::Done.to_db_string(), timestamp_now(), item_id],
        )?;

        if updated == 0 {
            return Err(LedgerError::ItemNotFound(item_id));
        }
        Ok(())
    }

    fn requeue_stale(&mut self, older_than: Duration) -> LedgerResult<usize> {
        let age = chrono::Duration::from_std(older_than)
            .unwrap_or_else(|_| chrono::Duration::days(36_500))
            .min(chrono::Duration::days(36_500));
        let cutoff = (Utc::now() - age).to_rfc3339_opts(SecondsFormat::Micros, true);

        let requeued = self.conn.execute(
            "UPDATE match_queue SET status = ?1, picked_at = NULL
             WHERE status = ?2 AND picked_at < ?3",
            params![
                QueueStatus::Queued.to_db_string(),
                QueueStatus::Processing.to_db_string(),
                cutoff
            ],
        )?;

        Ok(requeued)
    }

    fn get_item(&self, item_id: i64) -> LedgerResult<QueueItem> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM match_queue WHERE id = ?1", ITEM_COLUMNS),
                params![item_id],
                row_to_item,
            )
            .optional()?
            .ok_or(LedgerError::ItemNotFound(item_id))
    }

    // ===== Seen-set =====

    fn seen(&self, match_id: &str) -> LedgerResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_match_ids WHERE match_id = ?1",
                params![match_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn mark_seen(&mut self, match_id: &str, region: &str) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO seen_match_ids (match_id, region, seen_at) VALUES (?1, ?2, ?3)",
            params![match_id, region, timestamp_now()],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn queue_size(&self) -> LedgerResult<u64> {
        self.count_by_status(QueueStatus::Queued)
    }

    fn count_by_status(&self, status: QueueStatus) -> LedgerResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM match_queue WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_seen(&self) -> LedgerResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_match_ids", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn queued_by_region(&self) -> LedgerResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT region, COUNT(*) FROM match_queue WHERE status = ?1
             GROUP BY region ORDER BY region",
        )?;

        let rows = stmt
            .query_map(params![QueueStatus::Queued.to_db_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
