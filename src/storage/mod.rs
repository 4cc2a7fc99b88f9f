//! Storage abstractions for harvester state.
//!
//! Two concerns live here:
//! - the seen-store, the canonical record of processed detail links that
//!   backs the in-memory dedup filter
//! - run reports, the digest of each pipeline run
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── seen.json                  # Every processed detail link
//! └── reports/
//!     ├── latest.json            # Copy of the newest report
//!     └── 20261016T083000Z.json  # One file per run
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{RunReport, SeenRecord};

pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Object keys shared by the storage backends.
pub mod paths {
    use super::*;

    pub const SEEN: &str = "seen.json";
    pub const LATEST_REPORT: &str = "reports/latest.json";

    pub fn report_key(generated_at: DateTime<Utc>) -> String {
        format!("reports/{}.json", generated_at.format("%Y%m%dT%H%M%SZ"))
    }
}

/// Canonical store of processed detail links.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Every link ever inserted.
    async fn find_all_keys(&self) -> Result<Vec<String>>;

    /// Persist one processed link.
    async fn insert(&self, record: &SeenRecord) -> Result<()>;
}

/// Sink for run reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report, returning where it was written.
    async fn write_report(&self, report: &RunReport) -> Result<String>;

    /// The most recently written report, if any.
    async fn latest_report(&self) -> Result<Option<RunReport>>;
}
