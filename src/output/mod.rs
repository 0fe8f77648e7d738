//! Output module for operator-facing reports
//!
//! This module handles:
//! - Ledger statistics for the `stats` command
//! - The dry-run configuration report for the `check` command

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, LedgerStatistics};

use crate::config::Config;
use crate::routing::RoutingTable;
use std::fmt::Write as _;

/// Describes what a configuration would do, without touching the network
///
/// Seed targets whose platform has no routing region are flagged.
pub fn format_dry_run(config: &Config) -> String {
    let routing = RoutingTable::with_overrides(&config.routing);
    let mut out = String::new();

    let _ = writeln!(out, "=== match-crawler dry run ===\n");
    let _ = writeln!(out, "API:");
    let _ = writeln!(out, "  Base URL: {}", config.api.base_url);
    let _ = writeln!(
        out,
        "  Key: {}",
        if config.api.key.trim().is_empty() {
            "missing"
        } else {
            "set"
        }
    );
    let _ = writeln!(out, "  Timeout: {}s", config.api.timeout_secs);

    let _ = writeln!(out, "\nRate limits (per scope key, per process):");
    let _ = writeln!(out, "  {}/s, {}/120s", config.rate_limit.per_second, config.rate_limit.per_two_minutes);

    let _ = writeln!(out, "\nCrawler:");
    let _ = writeln!(out, "  Patch tag: {}", config.crawler.patch_tag);
    let _ = writeln!(out, "  Queue id: {}", config.crawler.queue_id);
    let _ = writeln!(out, "  Matches per player: {}", config.crawler.matches_per_player);
    match config.crawler.lease_timeout_secs {
        Some(secs) => {
            let _ = writeln!(out, "  Lease timeout: {}s", secs);
        }
        None => {
            let _ = writeln!(out, "  Lease timeout: disabled");
        }
    }

    let _ = writeln!(out, "\nLedger: {}", config.ledger.database_path);
    let _ = writeln!(out, "Blob storage: {} at {}", config.storage.backend, config.storage.root);

    let _ = writeln!(
        out,
        "\nRouting: {} platforms -> {}",
        routing.len(),
        routing.regions().join(", ")
    );

    let _ = writeln!(out, "\nSeed targets ({}):", config.seed.len());
    for target in &config.seed {
        let region = routing
            .region_for(&target.platform)
            .unwrap_or("UNKNOWN PLATFORM");
        let division = match (target.tier.is_apex(), target.division) {
            (false, Some(d)) => format!(" {}", d),
            (false, None) => " I".to_string(),
            (true, _) => String::new(),
        };
        let _ = writeln!(
            out,
            "  - {} {}{} -> {}",
            target.platform, target.tier, division, region
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Division, Tier};
    use crate::config::{ApiConfig, LedgerConfig, SeedTarget, StorageConfig};
    use std::collections::HashMap;

    #[test]
    fn test_dry_run_flags_unknown_platform() {
        let config = Config {
            api: ApiConfig::default(),
            rate_limit: Default::default(),
            crawler: Default::default(),
            ledger: LedgerConfig {
                database_path: "ledger.db".to_string(),
            },
            storage: StorageConfig {
                backend: "fs".to_string(),
                root: "data".to_string(),
            },
            routing: HashMap::new(),
            seed: vec![
                SeedTarget {
                    platform: "kr".to_string(),
                    tier: Tier::Diamond,
                    division: Some(Division::II),
                    max_pages: None,
                    max_players: None,
                },
                SeedTarget {
                    platform: "zz9".to_string(),
                    tier: Tier::Challenger,
                    division: None,
                    max_pages: None,
                    max_players: None,
                },
            ],
        };

        let text = format_dry_run(&config);
        assert!(text.contains("Key: missing"));
        assert!(text.contains("  - kr DIAMOND II -> asia"));
        assert!(text.contains("  - zz9 CHALLENGER -> UNKNOWN PLATFORM"));
        assert!(text.contains("Lease timeout: disabled"));
        assert!(text.contains("Routing: 16 platforms -> americas, asia, europe, sea"));
    }
}
