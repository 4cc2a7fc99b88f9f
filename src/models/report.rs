// src/models/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DetailRecord, DigestEntry};

/// A processed detail link as kept by the seen-store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenRecord {
    pub name: String,
    pub link: String,
    pub seen_at: DateTime<Utc>,
}

impl SeenRecord {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            seen_at: Utc::now(),
        }
    }
}

impl From<&DetailRecord> for SeenRecord {
    fn from(record: &DetailRecord) -> Self {
        Self::new(record.name(), record.link())
    }
}

/// Counters for one crawl.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlStats {
    /// Entries extracted from the listing page
    pub listed: usize,
    /// Entries skipped as already seen (or repeated on the page)
    pub skipped: usize,
    /// Detail records emitted
    pub emitted: usize,
    /// Detail fetch or parse failures
    pub failed: usize,
    /// Emitted records the seen-store failed to persist
    pub store_failures: usize,
}

/// How a crawl ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrawlTermination {
    Done,
    Cancelled,
}

/// Persisted result of one full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub listing_url: String,
    pub termination: CrawlTermination,
    pub stats: CrawlStats,
    /// Whether box-office enrichment was available for this run
    pub box_office_enriched: bool,
    pub entries: Vec<DigestEntry>,
    /// Plain-text digest rendered from `entries`
    pub digest: String,
    /// Where the report was stored; `None` when the write failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_location: Option<String>,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
