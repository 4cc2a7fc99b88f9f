//! Pipeline entry points for harvester operations.
//!
//! - `CrawlOrchestrator`: incremental crawl of the now-playing listing
//! - `run_box_office`: decoded box-office table, if available
//! - `run_pipeline`: both of the above joined into a stored digest

pub mod box_office;
pub mod crawl;
pub mod digest;
pub mod pipeline;

pub use box_office::{fetch_box_office, run_box_office};
pub use crawl::{CrawlOrchestrator, CrawlOutcome};
pub use digest::join_box_office;
pub use pipeline::{PipelineContext, run_pipeline};
