// src/pipeline/crawl.rs

//! Incremental listing crawl.
//!
//! One crawl fetches the listing page, drops entries the dedup store already
//! knows, and fetches the detail page of every remaining entry. A failed
//! listing fetch aborts the crawl; a failed detail page only drops that
//! entry, which stays unseen and is retried by the next run.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::{
    Config, CrawlStats, CrawlTermination, DetailInfo, DetailRecord, HeaderProfile, ListingEntry,
    SeenRecord,
};
use crate::services::{
    DedupStore, DetailExtractor, ListingExtractor, Pause, RequestGate, Throttle,
};
use crate::utils::http::Fetcher;

/// Records emitted by one crawl, in listing order.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<DetailRecord>,
    pub stats: CrawlStats,
    pub termination: CrawlTermination,
}

enum EntryResult {
    Emitted(DetailRecord),
    Failed { entry: ListingEntry, error: AppError },
    Cancelled,
}

/// Drives a single crawl of the listing source.
pub struct CrawlOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    listing_url: String,
    listing_profile: HeaderProfile,
    detail_profile: HeaderProfile,
    listing: ListingExtractor,
    detail: DetailExtractor,
    throttle: Throttle,
    gate: RequestGate,
    max_concurrent: usize,
    cancel: CancellationToken,
    span: Span,
}

impl CrawlOrchestrator {
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let listing_url = config.listing.url();
        Ok(Self {
            fetcher,
            listing: ListingExtractor::new(&config.listing.selectors, &listing_url)?,
            detail: DetailExtractor::new(&config.detail.selectors)?,
            listing_profile: config.listing_profile(),
            detail_profile: config.detail_profile(),
            throttle: Throttle::from_config(&config.crawler),
            gate: RequestGate::from_config(&config.crawler),
            max_concurrent: config.crawler.max_concurrent.max(1),
            cancel: CancellationToken::new(),
            span: tracing::info_span!("crawl", url = %listing_url),
            listing_url,
        })
    }

    /// Stop between steps once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.listing = self.listing.with_span(span.clone());
        self.span = span;
        self
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Run one crawl, marking every emitted record as seen in `dedup`.
    ///
    /// Returns `Err` only when the listing page cannot be fetched.
    pub async fn crawl(&self, dedup: &mut DedupStore) -> Result<CrawlOutcome> {
        self.crawl_inner(dedup).instrument(self.span.clone()).await
    }

    async fn crawl_inner(&self, dedup: &mut DedupStore) -> Result<CrawlOutcome> {
        let mut stats = CrawlStats::default();

        if self.cancel.is_cancelled() {
            info!("Cancelled before the listing fetch");
            return Ok(CrawlOutcome {
                records: Vec::new(),
                stats,
                termination: CrawlTermination::Cancelled,
            });
        }

        info!("Fetching listing {}", self.listing_url);
        let response = self
            .fetcher
            .fetch(&self.listing_url, &self.listing_profile)
            .await?;
        let entries = self.extract_listing(&response.text());
        stats.listed = entries.len();
        info!("Listing has {} entries", entries.len());

        let mut on_page = HashSet::new();
        let mut pending = Vec::new();
        for entry in entries {
            if !on_page.insert(entry.detail_link.clone()) {
                debug!("Skipping repeated entry {} ({})", entry.name, entry.detail_link);
                stats.skipped += 1;
            } else if dedup.exists(&entry.detail_link) {
                debug!("Skipping seen entry {} ({})", entry.name, entry.detail_link);
                stats.skipped += 1;
            } else {
                pending.push(entry);
            }
        }

        let mut records = Vec::with_capacity(pending.len());
        let mut termination = CrawlTermination::Done;

        let mut results = stream::iter(pending)
            .map(|entry| self.process_entry(entry))
            .buffered(self.max_concurrent);

        while let Some(result) = results.next().await {
            match result {
                EntryResult::Emitted(record) => {
                    if let Err(e) = dedup.add(record.link(), &SeenRecord::from(&record)).await {
                        warn!("Failed to persist seen link {}: {}", record.link(), e);
                        stats.store_failures += 1;
                    }
                    info!("Emitted {}", record.name());
                    stats.emitted += 1;
                    records.push(record);
                }
                EntryResult::Failed { entry, error } => {
                    warn!(
                        "Dropping {} ({}) this run: {}",
                        entry.name, entry.detail_link, error
                    );
                    stats.failed += 1;
                }
                EntryResult::Cancelled => termination = CrawlTermination::Cancelled,
            }
        }

        info!(
            "Crawl finished ({:?}): {} listed, {} skipped, {} emitted, {} failed",
            termination, stats.listed, stats.skipped, stats.emitted, stats.failed
        );
        Ok(CrawlOutcome {
            records,
            stats,
            termination,
        })
    }

    fn extract_listing(&self, html: &str) -> Vec<ListingEntry> {
        let document = Html::parse_document(html);
        self.listing.extract(&document).collect()
    }

    /// FETCH_DETAIL, PARSE_DETAIL and the politeness pause for one entry.
    ///
    /// Concurrent workers share `gate`, so detail requests to the host start
    /// at least the minimum delay apart.
    async fn process_entry(&self, entry: ListingEntry) -> EntryResult {
        if self.cancel.is_cancelled() {
            return EntryResult::Cancelled;
        }
        if self.gate.acquire(&self.cancel).await == Pause::Cancelled {
            return EntryResult::Cancelled;
        }

        let result = self.fetch_detail(&entry).await;
        self.throttle.pause(&self.cancel).await;

        match result {
            Ok(detail) => EntryResult::Emitted(DetailRecord::new(entry, detail)),
            Err(error) => EntryResult::Failed { entry, error },
        }
    }

    async fn fetch_detail(&self, entry: &ListingEntry) -> Result<DetailInfo> {
        debug!("Fetching detail page of {}", entry.name);
        let response = self
            .fetcher
            .fetch(&entry.detail_link, &self.detail_profile)
            .await?;
        self.detail.extract_html(&response.text())
    }
}
