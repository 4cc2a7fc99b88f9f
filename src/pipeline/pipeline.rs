// src/pipeline/pipeline.rs

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::error::Result;
use crate::models::{Config, RunReport, render_digest};
use crate::services::DedupStore;
use crate::storage::{ReportStore, SeenStore};
use crate::utils::http::Fetcher;
use crate::utils::log;

use super::box_office::run_box_office;
use super::crawl::CrawlOrchestrator;
use super::digest::join_box_office;

/// Collaborators of a full run.
pub struct PipelineContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub seen: Arc<dyn SeenStore>,
    pub reports: Arc<dyn ReportStore>,
    pub cancel: CancellationToken,
}

/// Run the full pipeline: box office, crawl, join, digest, report.
///
/// Fails only when the dedup store cannot load or the listing fetch fails.
/// A report that cannot be stored is still returned, with no location.
pub async fn run_pipeline(config: &Config, ctx: &PipelineContext) -> Result<RunReport> {
    let span = tracing::info_span!("run", city = %config.listing.city);
    run_pipeline_inner(config, ctx).instrument(span).await
}

async fn run_pipeline_inner(config: &Config, ctx: &PipelineContext) -> Result<RunReport> {
    const TOTAL_STEPS: usize = 4;
    log::header("Now-playing harvest");

    log::step(1, TOTAL_STEPS, "Box office - decoding obfuscated figures");
    let box_office = run_box_office(config, ctx.fetcher.as_ref()).await;

    log::step(2, TOTAL_STEPS, "Dedup - loading seen links");
    let mut dedup = DedupStore::load(ctx.seen.clone(), &config.dedup).await?;

    log::step(3, TOTAL_STEPS, "Crawl - fetching new movies");
    let crawler = CrawlOrchestrator::new(config, ctx.fetcher.clone())?
        .with_cancellation(ctx.cancel.clone());
    let outcome = crawler.crawl(&mut dedup).await?;

    log::step(4, TOTAL_STEPS, "Digest - joining and storing");
    let entries = join_box_office(outcome.records, box_office.as_deref());
    if entries.is_empty() {
        info!("no movies updated");
    }

    let mut report = RunReport {
        generated_at: Utc::now(),
        listing_url: crawler.listing_url().to_string(),
        termination: outcome.termination,
        stats: outcome.stats,
        box_office_enriched: box_office.is_some(),
        digest: render_digest(&entries),
        entries,
        report_location: None,
    };
    match ctx.reports.write_report(&report).await {
        Ok(location) => report.report_location = Some(location),
        Err(e) => warn!("Failed to store run report: {}", e),
    }

    log::summary(
        "Run complete",
        &[
            ("Listed", report.stats.listed.to_string()),
            ("Skipped", report.stats.skipped.to_string()),
            ("Emitted", report.stats.emitted.to_string()),
            ("Failed", report.stats.failed.to_string()),
            ("Termination", format!("{:?}", report.termination)),
            (
                "Report",
                report
                    .report_location
                    .clone()
                    .unwrap_or_else(|| "not stored".to_string()),
            ),
        ],
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::CrawlTermination;
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use crate::testing::{
        StubFetcher, box_office_page, detail_page, digit_codepoints, listing_page, test_config,
    };
    use tempfile::TempDir;

    const LISTING: &str = "https://movie.example.com/cinema/nowplaying/hefei/";
    const BOX_OFFICE: &str = "https://boxoffice.example.com/?ver=normal";

    fn context(fetcher: StubFetcher, storage: Arc<LocalStorage>) -> PipelineContext {
        PipelineContext {
            fetcher: Arc::new(fetcher),
            seen: storage.clone(),
            reports: storage,
            cancel: CancellationToken::new(),
        }
    }

    fn config() -> Config {
        let mut config = test_config(LISTING);
        config.box_office.url = BOX_OFFICE.to_string();
        config
    }

    #[tokio::test]
    async fn test_full_run_joins_and_persists() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let fetcher = StubFetcher::new()
            .page(
                BOX_OFFICE,
                box_office_page(&digit_codepoints(), &[("Arrival", "2.5亿", "上映9天", "31.2%")]),
            )
            .page(
                LISTING,
                listing_page(&[
                    ("Arrival", "https://movie.example.com/subject/1/"),
                    ("Dune", "https://movie.example.com/subject/2/"),
                ]),
            )
            .page(
                "https://movie.example.com/subject/1/",
                detail_page("2017-10-20(Region X)", &["Plot."], &["Great"]),
            )
            .page(
                "https://movie.example.com/subject/2/",
                detail_page("2018-03-01", &[], &[]),
            );

        let report = run_pipeline(&config(), &context(fetcher, storage.clone()))
            .await
            .unwrap();

        assert_eq!(report.termination, CrawlTermination::Done);
        assert!(report.box_office_enriched);
        assert_eq!(report.entries.len(), 2);
        assert!(report.digest.starts_with(
            "<Arrival>\tScore: 8.2\n上映9天\tBox office: 2.5亿\tSchedule share: 31.2%\n"
        ));
        assert!(report.digest.contains("<Dune>\t8.2\n"));
        assert_eq!(storage.find_all_keys().await.unwrap().len(), 2);
        assert!(storage.latest_report().await.unwrap().is_some());
        assert!(report.report_location.is_some());
    }

    struct FullDisk;

    #[async_trait]
    impl ReportStore for FullDisk {
        async fn write_report(&self, _report: &RunReport) -> Result<String> {
            Err(AppError::storage("disk full"))
        }

        async fn latest_report(&self) -> Result<Option<RunReport>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_report_write_failure_still_returns_digest() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let fetcher = StubFetcher::new()
            .status(BOX_OFFICE, 500)
            .page(
                LISTING,
                listing_page(&[("Arrival", "https://movie.example.com/subject/1/")]),
            )
            .page(
                "https://movie.example.com/subject/1/",
                detail_page("2017-10-20", &[], &[]),
            );
        let ctx = PipelineContext {
            fetcher: Arc::new(fetcher),
            seen: storage.clone(),
            reports: Arc::new(FullDisk),
            cancel: CancellationToken::new(),
        };

        let report = run_pipeline(&config(), &ctx).await.unwrap();

        assert!(report.report_location.is_none());
        assert_eq!(report.entries.len(), 1);
        assert!(report.digest.contains("<Arrival>"));
        assert_eq!(
            storage.find_all_keys().await.unwrap(),
            vec!["https://movie.example.com/subject/1/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_box_office_failure_still_crawls() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let fetcher = StubFetcher::new()
            .status(BOX_OFFICE, 500)
            .page(
                LISTING,
                listing_page(&[("Arrival", "https://movie.example.com/subject/1/")]),
            )
            .page(
                "https://movie.example.com/subject/1/",
                detail_page("2017-10-20", &[], &[]),
            );

        let report = run_pipeline(&config(), &context(fetcher, storage))
            .await
            .unwrap();

        assert!(!report.box_office_enriched);
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].box_office.is_none());
    }

    #[tokio::test]
    async fn test_listing_failure_fails_run() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let fetcher = StubFetcher::new().status(BOX_OFFICE, 500);

        assert!(run_pipeline(&config(), &context(fetcher, storage.clone())).await.is_err());
        assert!(storage.latest_report().await.unwrap().is_none());
    }
}
