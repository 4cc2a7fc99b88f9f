//! nowplaying CLI
//!
//! Local execution entry point. Scheduling is left to cron or similar.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use nowplaying::{
    config::load_config,
    error::Result,
    models::Config,
    pipeline::{self, CrawlOrchestrator, PipelineContext},
    services::DedupStore,
    storage::{LocalStorage, ReportStore, SeenStore},
    utils::http::{Fetcher, HttpSession},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// nowplaying - Now-playing movie harvester
#[derive(Parser, Debug)]
#[command(
    name = "nowplaying",
    version,
    about = "Incremental now-playing movie harvester"
)]
struct Cli {
    /// Storage directory for the seen store, reports and config.toml
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Explicit configuration file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listing city
    #[arg(long)]
    city: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Keep state in S3 (S3_BUCKET / S3_PREFIX) instead of the storage directory
    #[cfg(feature = "s3")]
    #[arg(long)]
    s3: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the listing and print newly seen movies as JSON
    Crawl,

    /// Fetch and decode the box-office table
    BoxOffice,

    /// Run the full pipeline and store a digest report
    Run,

    /// Validate configuration
    Validate,

    /// Show seen-store and latest report info
    Info,
}

struct Stores {
    seen: Arc<dyn SeenStore>,
    reports: Arc<dyn ReportStore>,
    location: String,
}

/// Initialize tracing based on flags and `RUST_LOG`.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load(cli: &Cli) -> Result<Config> {
    let search_dir = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("storage"));
    let mut config = load_config(cli.config.as_deref(), &search_dir)?;

    if let Some(dir) = &cli.storage_dir {
        config.storage.dir = dir.clone();
    }
    if let Some(city) = &cli.city {
        config.listing.city = city.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn open_stores(cli: &Cli, config: &Config) -> Result<Stores> {
    #[cfg(not(feature = "s3"))]
    let _ = cli;

    #[cfg(feature = "s3")]
    if cli.s3 {
        let s3 = Arc::new(nowplaying::storage::S3Storage::from_env().await?);
        return Ok(Stores {
            seen: s3.clone(),
            reports: s3,
            location: "s3".to_string(),
        });
    }

    let local = Arc::new(LocalStorage::new(&config.storage.dir));
    Ok(Stores {
        seen: local.clone(),
        reports: local,
        location: config.storage.dir.display().to_string(),
    })
}

/// Cancel `token` on Ctrl-C so the crawl stops between steps.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current step");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    let config = load(&cli)?;
    info!("Listing source: {}", config.listing.url());

    match &cli.command {
        Command::Crawl => {
            let stores = open_stores(&cli, &config).await?;
            let fetcher: Arc<dyn Fetcher> = Arc::new(HttpSession::from_config(&config.crawler)?);

            let mut dedup = DedupStore::load(stores.seen, &config.dedup).await?;
            let outcome = CrawlOrchestrator::new(&config, fetcher)?
                .with_cancellation(cancel_on_interrupt())
                .crawl(&mut dedup)
                .await?;

            println!("{}", serde_json::to_string_pretty(&outcome.records)?);
            info!(
                "{} new of {} listed ({:?})",
                outcome.stats.emitted, outcome.stats.listed, outcome.termination
            );
        }

        Command::BoxOffice => {
            let session = HttpSession::from_config(&config.crawler)?;
            let span = tracing::info_span!("box_office", url = %config.box_office.url);
            let records = pipeline::fetch_box_office(&config, &session, span).await?;

            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Command::Run => {
            let stores = open_stores(&cli, &config).await?;
            let ctx = PipelineContext {
                fetcher: Arc::new(HttpSession::from_config(&config.crawler)?),
                seen: stores.seen,
                reports: stores.reports,
                cancel: cancel_on_interrupt(),
            };

            let report = pipeline::run_pipeline(&config, &ctx).await?;
            if report.report_location.is_none() {
                warn!("Digest was not stored; printing it only");
            }
            if !report.is_empty() {
                println!("{}", report.digest);
            }
        }

        Command::Validate => {
            info!("Validating configuration...");
            // `load` validates after applying overrides; reaching here means it passed.
            info!("✓ Config OK (sources, selectors and dedup tuning)");
        }

        Command::Info => {
            let stores = open_stores(&cli, &config).await?;
            info!("Storage: {}", stores.location);
            info!("Seen links: {}", stores.seen.find_all_keys().await?.len());

            match stores.reports.latest_report().await? {
                Some(report) => {
                    info!("Last run: {}", report.generated_at);
                    info!(
                        "Last run stats: {} listed, {} emitted, {} failed ({:?})",
                        report.stats.listed,
                        report.stats.emitted,
                        report.stats.failed,
                        report.termination
                    );
                }
                None => info!("No report found yet."),
            }
        }
    }

    Ok(())
}
