// src/services/listing.rs

//! Now-playing listing extraction.
//!
//! The listing schema is declarative: every item is located by a selector and
//! its fields are read from the attributes named in `ListingFields`.

use scraper::{ElementRef, Html, Selector};
use tracing::{Span, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ListingEntry, ListingFields, ListingSelectors};
use crate::utils::{parse_selector, resolve_url};

/// Turns listing markup into `ListingEntry` values.
pub struct ListingExtractor {
    item: Selector,
    link: Selector,
    link_attr: String,
    fields: ListingFields,
    base_url: Url,
    span: Span,
}

impl ListingExtractor {
    /// Compile the listing schema. Relative links resolve against `base_url`.
    pub fn new(selectors: &ListingSelectors, base_url: &str) -> Result<Self> {
        Ok(Self {
            item: parse_selector(&selectors.item_selector)?,
            link: parse_selector(&selectors.link_selector)?,
            link_attr: selectors.link_attr.clone(),
            fields: selectors.fields.clone(),
            base_url: Url::parse(base_url)?,
            span: tracing::info_span!("listing"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Lazily yield the well-formed entries of `document`, in page order.
    ///
    /// Items missing a field or link are skipped with a warning.
    pub fn extract<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ListingEntry> + 'a {
        document
            .select(&self.item)
            .filter_map(move |item| match self.parse_item(&item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    let _guard = self.span.enter();
                    warn!("Skipping malformed listing item: {}", e);
                    None
                }
            })
    }

    fn parse_item(&self, item: &ElementRef<'_>) -> Result<ListingEntry> {
        let field = |attr: &str| -> Result<String> {
            item.value()
                .attr(attr)
                .map(|value| value.trim().to_string())
                .ok_or_else(|| AppError::parse(format!("listing item has no '{attr}' attribute")))
        };

        let name = field(&self.fields.name)?;
        let score = field(&self.fields.score)?;
        let region = field(&self.fields.region)?;
        let director = field(&self.fields.director)?;
        let actors = field(&self.fields.actors)?;

        let href = item
            .select(&self.link)
            .find_map(|anchor| anchor.value().attr(&self.link_attr))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| AppError::parse(format!("listing item '{name}' has no detail link")))?;

        Ok(ListingEntry {
            name,
            score,
            region,
            director,
            actors,
            detail_link: resolve_url(&self.base_url, href),
        })
    }
}
