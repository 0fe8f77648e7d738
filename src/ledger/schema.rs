//! Database schema definitions for the work ledger

/// SQL schema for the ledger database
pub const SCHEMA_SQL: &str = r#"
-- Match fetch work items; rows are never deleted
CREATE TABLE IF NOT EXISTS match_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id TEXT NOT NULL UNIQUE,
    region TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    enqueued_at TEXT NOT NULL,
    picked_at TEXT,
    done_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_match_queue_status ON match_queue(status, enqueued_at);

-- Matches whose payloads are durably stored
CREATE TABLE IF NOT EXISTS seen_match_ids (
    match_id TEXT PRIMARY KEY,
    region TEXT NOT NULL,
    seen_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
