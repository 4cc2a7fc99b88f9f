// src/services/dedup.rs

//! Seen-link membership: a scalable Bloom filter over a canonical store.

use std::sync::Arc;

use tracing::{Instrument, Span, debug, info};

use crate::error::Result;
use crate::models::{DedupConfig, SeenRecord};
use crate::services::bloom::ScalableBloom;
use crate::storage::SeenStore;

/// Answers "was this detail link processed before?".
///
/// Lookups consult only the in-memory filter. A false positive (bounded by
/// `dedup.false_positive_rate`) suppresses that link until the canonical
/// store is purged. Only one writer may hold a `DedupStore` at a time.
pub struct DedupStore {
    filter: ScalableBloom,
    store: Arc<dyn SeenStore>,
    span: Span,
}

impl DedupStore {
    /// Build the filter from every key the canonical store knows.
    pub async fn load(store: Arc<dyn SeenStore>, config: &DedupConfig) -> Result<Self> {
        Self::load_with_span(store, config, tracing::info_span!("dedup")).await
    }

    pub async fn load_with_span(
        store: Arc<dyn SeenStore>,
        config: &DedupConfig,
        span: Span,
    ) -> Result<Self> {
        let mut filter = ScalableBloom::new(config)?;

        let keys = store.find_all_keys().instrument(span.clone()).await?;
        for key in &keys {
            filter.insert(key)?;
        }

        span.in_scope(|| info!("Loaded {} seen links", keys.len()));
        Ok(Self {
            filter,
            store,
            span,
        })
    }

    /// Filter lookup only; never false negative.
    pub fn exists(&self, key: &str) -> bool {
        self.filter.contains(key)
    }

    /// Mark `key` as seen: filter first, then the canonical store.
    ///
    /// If the store insert fails the key stays in the filter for this
    /// process but will be fetched again by the next run.
    pub async fn add(&mut self, key: &str, record: &SeenRecord) -> Result<()> {
        self.filter.insert(key)?;
        self.store.insert(record).instrument(self.span.clone()).await?;
        self.span.in_scope(|| debug!("Marked {} as seen", key));
        Ok(())
    }

    /// Keys the filter believes it holds.
    pub fn len(&self) -> usize {
        self.filter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
    }
}
