// src/services/detail.rs

//! Movie detail page extraction.

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{DetailInfo, DetailSelectors};
use crate::utils::{element_text, parse_selector};

/// Extracts release date, summary and hot comments from a detail page.
pub struct DetailExtractor {
    release_date: Selector,
    summary: Selector,
    comments: Selector,
}

impl DetailExtractor {
    pub fn new(selectors: &DetailSelectors) -> Result<Self> {
        Ok(Self {
            release_date: parse_selector(&selectors.release_date)?,
            summary: parse_selector(&selectors.summary)?,
            comments: parse_selector(&selectors.comments)?,
        })
    }

    /// Parse raw markup and extract the detail fields.
    pub fn extract_html(&self, html: &str) -> Result<DetailInfo> {
        self.extract(&Html::parse_document(html))
    }

    /// Extract the detail fields from a parsed page.
    ///
    /// A missing release date is an error; summary and comments degrade to empty.
    pub fn extract(&self, document: &Html) -> Result<DetailInfo> {
        let release_date = document
            .select(&self.release_date)
            .next()
            .map(|node| truncate_release_date(&element_text(&node)))
            .filter(|date| !date.is_empty())
            .ok_or_else(|| AppError::parse("detail page has no release date"))?;

        let summary = document
            .select(&self.summary)
            .flat_map(|node| node.text())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");

        let hot_comments = document
            .select(&self.comments)
            .map(|node| element_text(&node).trim().to_string())
            .filter(|comment| !comment.is_empty())
            .collect();

        Ok(DetailInfo {
            release_date,
            summary,
            hot_comments,
        })
    }
}

/// Drop the parenthesised region annotation from a release date.
pub fn truncate_release_date(text: &str) -> String {
    text.split('(').next().unwrap_or_default().trim().to_string()
}
