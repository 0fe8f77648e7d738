//! match-crawler main entry point
//!
//! This is the command-line interface for seeding the match queue and running
//! ingestion workers.

use clap::{Parser, Subcommand};
use match_crawler::config::{load_config_with_hash, Config};
use match_crawler::crawler::build_crawler;
use match_crawler::ledger::SqliteLedger;
use match_crawler::output::{format_dry_run, load_statistics, print_statistics};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// match-crawler: a quota-aware ranked match ingester
///
/// Discovers ranked matches from ladder slices, queues them in a durable
/// SQLite ledger and stores the raw match and timeline payloads. Several
/// workers may share one ledger.
#[derive(Parser, Debug)]
#[command(name = "match-crawler")]
#[command(version)]
#[command(about = "A quota-aware ranked match ingester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", env = "MATCH_CRAWLER_CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enqueue recent matches of players from the configured [[seed]] targets
    Seed,

    /// Process queued matches until the queue is empty or the cap is reached
    Drain {
        /// Maximum number of items to claim
        #[arg(long, default_value_t = 200)]
        max_items: usize,
    },

    /// Run a worker until interrupted (Ctrl-C)
    Work,

    /// Show queue statistics from the ledger and exit
    Stats,

    /// Return items stuck in processing to the queue
    RequeueStale {
        /// Requeue items claimed longer ago than this
        #[arg(long, value_name = "SECS")]
        older_than_secs: u64,
    },

    /// Validate the config and show what would be crawled
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Seed => handle_seed(config).await?,
        Command::Drain { max_items } => handle_drain(config, max_items).await?,
        Command::Work => handle_work(config).await?,
        Command::Stats => handle_stats(&config)?,
        Command::RequeueStale { older_than_secs } => {
            handle_requeue_stale(&config, Duration::from_secs(older_than_secs))?
        }
        Command::Check => print!("{}", format_dry_run(&config)),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("match_crawler=info,warn"),
            1 => EnvFilter::new("match_crawler=debug,info"),
            2 => EnvFilter::new("match_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the seed command: ladder discovery into the queue
async fn handle_seed(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.seed.is_empty() {
        tracing::warn!("No [[seed]] targets configured, nothing to do");
        return Ok(());
    }

    let targets = config.seed.clone();
    let crawler = build_crawler(config)?;
    let reporter = crawler
        .metrics()
        .start_reporter(Duration::from_secs(crawler.config().crawler.report_interval_secs));

    let result = crawler.seed(&targets).await;

    if let Some(reporter) = reporter {
        reporter.stop().await;
    }
    tracing::info!("\n{}", crawler.metrics().render_summary());

    match result {
        Ok(report) => {
            println!(
                "Seeded {} targets ({} failed): {} players, {} new matches queued",
                report.targets, report.targets_failed, report.players, report.enqueued
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Seeding failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the drain command: bounded processing of the queue
async fn handle_drain(config: Config, max_items: usize) -> Result<(), Box<dyn std::error::Error>> {
    let crawler = build_crawler(config)?;
    let reporter = crawler
        .metrics()
        .start_reporter(Duration::from_secs(crawler.config().crawler.report_interval_secs));

    let result = crawler.drain(max_items).await;

    if let Some(reporter) = reporter {
        reporter.stop().await;
    }
    tracing::info!("\n{}", crawler.metrics().render_summary());

    let processed = result?;
    println!("Processed {} items", processed);
    Ok(())
}

/// Handles the work command: long-running worker until Ctrl-C
async fn handle_work(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let crawler = build_crawler(config)?;
    let shutdown = Arc::new(AtomicBool::new(false));

    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping after the current item");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    let reporter = crawler
        .metrics()
        .start_reporter(Duration::from_secs(crawler.config().crawler.report_interval_secs));

    let result = crawler.run(shutdown).await;

    if let Some(reporter) = reporter {
        reporter.stop().await;
    }
    tracing::info!("\n{}", crawler.metrics().render_summary());

    match result {
        Ok(processed) => {
            tracing::info!("Worker exited cleanly after {} items", processed);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Worker aborted: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the stats command: shows ledger statistics
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.ledger.database_path);

    let ledger = SqliteLedger::new(Path::new(&config.ledger.database_path))?;
    let stats = load_statistics(&ledger)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the requeue-stale command
fn handle_requeue_stale(
    config: &Config,
    older_than: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    use match_crawler::ledger::WorkLedger;

    let mut ledger = SqliteLedger::new(Path::new(&config.ledger.database_path))?;
    let requeued = ledger.requeue_stale(older_than)?;
    println!("Requeued {} items", requeued);
    Ok(())
}
