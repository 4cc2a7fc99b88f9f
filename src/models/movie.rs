//! Movie records produced by the listing and detail extractors.

use serde::{Deserialize, Serialize};

/// A movie as it appears on the now-playing listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingEntry {
    /// Movie title
    pub name: String,

    /// Rating as shown on the listing (kept verbatim)
    pub score: String,

    /// Production region
    pub region: String,

    /// Director(s)
    pub director: String,

    /// Leading actors
    pub actors: String,

    /// Absolute URL of the detail page; the dedup key
    pub detail_link: String,
}

/// Fields only available on the detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailInfo {
    pub release_date: String,
    pub summary: String,
    pub hot_comments: Vec<String>,
}

/// A fully crawled movie: listing fields plus detail fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailRecord {
    #[serde(flatten)]
    pub entry: ListingEntry,

    #[serde(flatten)]
    pub detail: DetailInfo,
}

impl DetailRecord {
    pub fn new(entry: ListingEntry, detail: DetailInfo) -> Self {
        Self { entry, detail }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn link(&self) -> &str {
        &self.entry.detail_link
    }
}
