//! Seeding: ladder discovery -> identity resolution -> match id enqueue

use crate::api::{ApiError, GameApi, LadderEntry, MatchIdFilter};
use crate::blob::BlobStore;
use crate::config::SeedTarget;
use crate::crawler::retry::CallSite;
use crate::crawler::Crawler;
use crate::ledger::WorkLedger;
use crate::{CrawlError, Result};
use chrono::Utc;
use std::collections::HashSet;

/// Counters from one seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub targets: usize,
    /// Targets abandoned because of an error (unknown platform, ladder failure)
    pub targets_failed: usize,
    pub entries: usize,
    /// Entries skipped because the same player was already handled this run
    pub duplicates: usize,
    /// Entries that could not be resolved to a puuid
    pub unresolved: usize,
    pub players: usize,
    pub players_without_matches: usize,
    /// Genuinely new queue rows
    pub enqueued: usize,
}

/// Players already handled in the current run
#[derive(Default)]
struct SeenPlayers {
    entry_keys: HashSet<String>,
    puuids: HashSet<String>,
}

impl<A: GameApi, B: BlobStore> Crawler<A, B> {
    /// Discovers players from ladder slices and enqueues their recent matches
    ///
    /// Entries are deduplicated across all targets of the run. Failures for
    /// one target or one player are logged and skipped; rejected
    /// credentials abort the whole run.
    ///
    /// # Returns
    ///
    /// * `Ok(SeedReport)` - Counters for the run
    /// * `Err(CrawlError)` - Credentials rejected or the ledger failed
    pub async fn seed(&self, targets: &[SeedTarget]) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let mut seen = SeenPlayers::default();

        for target in targets {
            report.targets += 1;
            tracing::info!(
                "Seeding {} {}{}",
                target.platform,
                target.tier,
                target
                    .division
                    .filter(|_| !target.tier.is_apex())
                    .map(|d| format!(" {}", d))
                    .unwrap_or_default()
            );

            match self.seed_target(target, &mut seen, &mut report).await {
                Ok(()) => {}
                Err(e) if e.is_fatal_auth() => return Err(e),
                Err(e @ CrawlError::Ledger(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Seeding {} {} failed: {}", target.platform, target.tier, e);
                    report.targets_failed += 1;
                }
            }
        }

        self.refresh_queue_size()?;
        tracing::info!(
            "Seeding done: enqueued={}, players={}, players_with_no_ids={}, unresolved={}",
            report.enqueued,
            report.players,
            report.players_without_matches,
            report.unresolved
        );
        Ok(report)
    }

    /// Seeds one target, reading ladder pages only while players are needed
    async fn seed_target(
        &self,
        target: &SeedTarget,
        seen: &mut SeenPlayers,
        report: &mut SeedReport,
    ) -> Result<()> {
        let platform = target.platform.to_lowercase();
        let region = self
            .routing
            .region_for(&platform)
            .ok_or_else(|| CrawlError::UnknownPlatform(platform.clone()))?
            .to_string();

        let filter = self.match_id_filter();
        let cap_reached = |players: usize| target.max_players.is_some_and(|cap| players >= cap);
        let mut players = 0usize;
        let mut entries = 0usize;
        let mut page: u32 = 1;

        while !cap_reached(players) {
            let batch = match self.ladder_page(&platform, target, page).await? {
                Some(batch) => batch,
                None => break,
            };
            tracing::debug!("{} ladder entries on {} {} page {}", batch.len(), platform, target.tier, page);
            report.entries += batch.len();

            for entry in &batch {
                if cap_reached(players) {
                    break;
                }
                entries += 1;

                if self
                    .seed_entry(&platform, &region, entry, &filter, seen, report)
                    .await?
                {
                    players += 1;
                }

                if entries % 10 == 0 {
                    tracing::info!(
                        "Processed {} entries from {} {}, enqueued so far: {}",
                        entries,
                        platform,
                        target.tier,
                        report.enqueued
                    );
                }
            }

            if target.tier.is_apex() || target.max_pages.is_some_and(|cap| page >= cap) {
                break;
            }
            page += 1;
        }

        tracing::info!(
            "{} ladder entries and {} new players from {} {}",
            entries,
            players,
            platform,
            target.tier
        );
        Ok(())
    }

    /// Handles one ladder entry
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The entry was a player not yet handled this run
    /// * `Ok(false)` - Duplicate or unresolvable entry
    /// * `Err(CrawlError)` - Credentials rejected or the ledger failed
    async fn seed_entry(
        &self,
        platform: &str,
        region: &str,
        entry: &LadderEntry,
        filter: &MatchIdFilter,
        seen: &mut SeenPlayers,
        report: &mut SeedReport,
    ) -> Result<bool> {
        let key = match entry.dedup_key() {
            Some(key) => key,
            None => {
                tracing::debug!("Entry without puuid/summonerId/summonerName, skipping");
                report.unresolved += 1;
                return Ok(false);
            }
        };
        if !seen.entry_keys.insert(key) {
            report.duplicates += 1;
            return Ok(false);
        }

        let puuid = match self.resolve_entry(platform, entry).await {
            Ok(Some(puuid)) => puuid,
            Ok(None) => {
                report.unresolved += 1;
                return Ok(false);
            }
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Summoner lookup failed on {}: {}", platform, e);
                report.unresolved += 1;
                return Ok(false);
            }
        };
        if !seen.puuids.insert(puuid.clone()) {
            report.duplicates += 1;
            return Ok(false);
        }
        report.players += 1;

        let api = &self.api;
        let puuid_ref = puuid.as_str();
        let ids = match self
            .gated(CallSite::routing(region, "match_ids"), move || {
                api.list_recent_match_ids(region, puuid_ref, filter)
            })
            .await
        {
            Ok(ids) => ids,
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Match id listing failed for {}: {}", puuid, e);
                return Ok(true);
            }
        };

        if ids.is_empty() {
            // Not fatal: some players have no recent games in this queue
            report.players_without_matches += 1;
            return Ok(true);
        }

        let added = self.lock_ledger().enqueue(region, &ids)?;
        self.metrics.record_enqueued(region, added as u64);
        report.enqueued += added;
        Ok(true)
    }

    /// Fetches one ladder page
    ///
    /// Apex tiers only have page 1. A failure after the first page ends
    /// paging instead of failing the target.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(entries))` - A non-empty page
    /// * `Ok(None)` - No more pages
    /// * `Err(CrawlError)` - The first page failed, or credentials were rejected
    async fn ladder_page(
        &self,
        platform: &str,
        target: &SeedTarget,
        page: u32,
    ) -> Result<Option<Vec<LadderEntry>>> {
        let api = &self.api;
        let queue = self.config.crawler.ladder_queue.as_str();
        let tier = target.tier;
        let division = if tier.is_apex() { None } else { target.division };

        let result = self
            .gated(CallSite::platform(platform, "league"), move || {
                api.list_ladder_entries(platform, queue, tier, division, page)
            })
            .await;

        match result {
            Ok(batch) if batch.is_empty() => Ok(None),
            Ok(batch) => Ok(Some(batch)),
            Err(e) if page > 1 && !e.is_auth() => {
                tracing::warn!("Ladder page {} failed on {}: {}", page, platform, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves an entry to a puuid, looking it up only when needed
    async fn resolve_entry(
        &self,
        platform: &str,
        entry: &LadderEntry,
    ) -> std::result::Result<Option<String>, ApiError> {
        if let Some(puuid) = entry.puuid.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            return Ok(Some(puuid.to_string()));
        }

        let player = match entry.player_ref() {
            Some(player) => player,
            None => return Ok(None),
        };

        let api = &self.api;
        let player_ref = &player;
        match self
            .gated(CallSite::platform(platform, "summoner"), move || {
                api.resolve_identity(platform, player_ref)
            })
            .await
        {
            Ok(identity) if !identity.puuid.is_empty() => Ok(Some(identity.puuid)),
            Ok(_) => {
                tracing::debug!("No puuid resolved for {:?}", player);
                Ok(None)
            }
            Err(ApiError::NotFound { .. }) => {
                tracing::debug!("Summoner {:?} not found", player);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn match_id_filter(&self) -> MatchIdFilter {
        let crawler = &self.config.crawler;
        MatchIdFilter {
            queue: Some(crawler.queue_id),
            start: 0,
            count: crawler.matches_per_player,
            start_time: crawler
                .lookback_days
                .map(|days| Utc::now().timestamp() - i64::from(days) * 86_400),
            end_time: None,
            kind: Some("ranked".to_string()),
        }
    }
}
