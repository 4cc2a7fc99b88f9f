// src/services/box_office.rs

//! Box-office table parsing.

use scraper::{Html, Selector};
use tracing::{Span, debug, warn};

use crate::error::Result;
use crate::models::{BoxOfficeRecord, BoxOfficeSelectors};
use crate::services::glyphs::GlyphMapDecoder;
use crate::services::numeric::NumericFieldDecoder;
use crate::utils::{element_text, parse_selector};

/// Turns a box-office page into decoded rows.
///
/// The four column lists are collected independently and zipped by
/// position, so a row missing one of its cells shifts every later row.
/// Unequal lengths truncate to the shortest list.
pub struct BoxOfficeParser {
    glyphs: GlyphMapDecoder,
    movie_name: Selector,
    box_office: Selector,
    release_days: Selector,
    schedule_rate: Selector,
    span: Span,
}

impl BoxOfficeParser {
    pub fn new(selectors: &BoxOfficeSelectors) -> Result<Self> {
        Ok(Self {
            glyphs: GlyphMapDecoder::new(&selectors.font_style)?,
            movie_name: parse_selector(&selectors.movie_name)?,
            box_office: parse_selector(&selectors.box_office)?,
            release_days: parse_selector(&selectors.release_days)?,
            schedule_rate: parse_selector(&selectors.schedule_rate)?,
            span: tracing::info_span!("box_office"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Decode the page's font and every row of its table.
    pub fn parse(&self, html: &str) -> Result<Vec<BoxOfficeRecord>> {
        let _enter = self.span.enter();
        let document = Html::parse_document(html);

        let decoder = NumericFieldDecoder::new(self.glyphs.decode_document(&document)?);
        debug!("Decoded glyph map with {} digits", decoder.mapping().len());

        let names = texts(&document, &self.movie_name);
        let totals = texts(&document, &self.box_office);
        let days = texts(&document, &self.release_days);
        let rates = texts(&document, &self.schedule_rate);

        let lengths = [names.len(), totals.len(), days.len(), rates.len()];
        if lengths.iter().any(|&n| n != lengths[0]) {
            warn!(
                "Box-office columns differ in length (names {}, totals {}, days {}, rates {}); truncating",
                lengths[0], lengths[1], lengths[2], lengths[3]
            );
        }

        let records: Vec<BoxOfficeRecord> = names
            .into_iter()
            .zip(totals)
            .zip(days)
            .zip(rates)
            .map(|(((name, total), days), rate)| BoxOfficeRecord {
                movie_name: name,
                cumulative_box_office: decoder.decode(&total),
                release_days: decoder.decode(&days),
                schedule_rate_percent: decoder.decode(&rate),
            })
            .collect();

        debug!("Parsed {} box-office rows", records.len());
        Ok(records)
    }
}

fn texts(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|node| element_text(&node).trim().to_string())
        .collect()
}
