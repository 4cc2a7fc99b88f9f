// src/pipeline/box_office.rs

//! Box-office enrichment fetch.

use tracing::{Instrument, Span, info, warn};

use crate::error::Result;
use crate::models::{BoxOfficeRecord, Config};
use crate::services::BoxOfficeParser;
use crate::utils::http::Fetcher;

/// Fetch and decode the box-office table.
pub async fn fetch_box_office(
    config: &Config,
    fetcher: &dyn Fetcher,
    span: Span,
) -> Result<Vec<BoxOfficeRecord>> {
    let parser = BoxOfficeParser::new(&config.box_office.selectors)?.with_span(span.clone());

    let response = fetcher
        .fetch(&config.box_office.url, &config.box_office_profile())
        .instrument(span)
        .await?;
    parser.parse(&response.text())
}

/// Box-office rows for this run, or `None` when enrichment is off or failed.
///
/// A failure here never fails the run; it only disables enrichment.
pub async fn run_box_office(config: &Config, fetcher: &dyn Fetcher) -> Option<Vec<BoxOfficeRecord>> {
    let span = tracing::info_span!("box_office", url = %config.box_office.url);

    if !config.box_office.enabled {
        span.in_scope(|| info!("Box-office enrichment disabled"));
        return None;
    }

    match fetch_box_office(config, fetcher, span.clone()).await {
        Ok(records) => {
            span.in_scope(|| info!("Decoded {} box-office rows", records.len()));
            Some(records)
        }
        Err(e) => {
            span.in_scope(|| warn!("Box-office enrichment unavailable this run: {}", e));
            None
        }
    }
}
