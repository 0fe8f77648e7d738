//! Statistics generation from the work ledger
//!
//! This module provides functionality for extracting and displaying
//! queue and dedup statistics from the ledger.

use crate::ledger::{LedgerResult, QueueStatus, WorkLedger};
use std::fmt::Write as _;

/// Ledger statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStatistics {
    /// Items waiting to be claimed
    pub queued: u64,

    /// Items claimed and not yet acknowledged (in flight or stuck)
    pub processing: u64,

    /// Acknowledged items
    pub done: u64,

    /// Matches with stored payloads
    pub seen: u64,

    /// Queued items per routing region, sorted by region
    pub queued_by_region: Vec<(String, u64)>,
}

impl LedgerStatistics {
    pub fn total_items(&self) -> u64 {
        self.queued + self.processing + self.done
    }
}

/// Loads statistics from the ledger
///
/// # Arguments
///
/// * `ledger` - The ledger to query
///
/// # Returns
///
/// * `Ok(LedgerStatistics)` - Successfully loaded statistics
/// * `Err(LedgerError)` - Failed to query the ledger
pub fn load_statistics(ledger: &dyn WorkLedger) -> LedgerResult<LedgerStatistics> {
    let mut queued_by_region = ledger.queued_by_region()?;
    queued_by_region.sort();

    Ok(LedgerStatistics {
        queued: ledger.count_by_status(QueueStatus::Queued)?,
        processing: ledger.count_by_status(QueueStatus::Processing)?,
        done: ledger.count_by_status(QueueStatus::Done)?,
        seen: ledger.count_seen()?,
        queued_by_region,
    })
}

/// Formats statistics for display
pub fn format_statistics(stats: &LedgerStatistics) -> String {
    let mut out = String::new();
    let total = stats.total_items();
    let pct = |n: u64| {
        if total > 0 {
            (n as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    };

    let _ = writeln!(out, "=== Ledger Statistics ===\n");
    let _ = writeln!(out, "Queue items: {}", total);
    let _ = writeln!(out, "  queued:     {} ({:.1}%)", stats.queued, pct(stats.queued));
    let _ = writeln!(
        out,
        "  processing: {} ({:.1}%)",
        stats.processing,
        pct(stats.processing)
    );
    let _ = writeln!(out, "  done:       {} ({:.1}%)", stats.done, pct(stats.done));
    let _ = writeln!(out, "\nStored matches: {}", stats.seen);

    if !stats.queued_by_region.is_empty() {
        let _ = writeln!(out, "\nQueued by region:");
        for (region, count) in &stats.queued_by_region {
            let _ = writeln!(out, "  - {}: {}", region, count);
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &LedgerStatistics) {
    print!("{}", format_statistics(stats));
}
