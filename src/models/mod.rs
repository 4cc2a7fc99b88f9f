// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod box_office;
mod config;
mod digest;
mod movie;
mod report;
mod selectors;

// Re-export all public types
pub use box_office::{BoxOfficeRecord, DIGIT_GLYPHS, GlyphMapping};
pub use config::{
    BoxOfficeConfig, Config, CrawlerConfig, DedupConfig, DetailConfig, HeaderProfile,
    ListingConfig, StorageConfig,
};
pub use digest::{DigestEntry, render_digest};
pub use movie::{DetailInfo, DetailRecord, ListingEntry};
pub use report::{CrawlStats, CrawlTermination, RunReport, SeenRecord};
pub use selectors::{BoxOfficeSelectors, DetailSelectors, ListingFields, ListingSelectors};
