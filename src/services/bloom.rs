// src/services/bloom.rs

//! Scalable Bloom filter.
//!
//! A chain of fixed-size `bloomfilter::Bloom` layers. When the newest layer
//! reaches its capacity a larger one is appended with a tighter error rate,
//! so the compound false-positive rate stays below the configured bound no
//! matter how many keys are added. There are never false negatives.

use bloomfilter::Bloom;

use crate::error::{AppError, Result};
use crate::models::DedupConfig;

struct Layer {
    bloom: Bloom<str>,
    capacity: usize,
    len: usize,
}

impl Layer {
    fn new(capacity: usize, error_rate: f64) -> Result<Self> {
        let bloom = Bloom::new_for_fp_rate(capacity, error_rate)
            .map_err(|e| AppError::config(format!("cannot size bloom filter layer: {e}")))?;
        Ok(Self {
            bloom,
            capacity,
            len: 0,
        })
    }

    fn is_full(&self) -> bool {
        self.len >= self.capacity
    }
}

pub struct ScalableBloom {
    layers: Vec<Layer>,
    growth_factor: usize,
    tightening_ratio: f64,
    next_capacity: usize,
    next_error_rate: f64,
    len: usize,
}

impl ScalableBloom {
    pub fn new(config: &DedupConfig) -> Result<Self> {
        let mut filter = Self {
            layers: Vec::new(),
            growth_factor: config.growth_factor.max(2),
            tightening_ratio: config.tightening_ratio,
            next_capacity: config.initial_capacity.max(1),
            // Sum over layers of rate * (1 - r) * r^i stays below rate.
            next_error_rate: config.false_positive_rate * (1.0 - config.tightening_ratio),
            len: 0,
        };
        filter.push_layer()?;
        Ok(filter)
    }

    fn push_layer(&mut self) -> Result<()> {
        self.layers
            .push(Layer::new(self.next_capacity, self.next_error_rate)?);
        self.next_capacity = self.next_capacity.saturating_mul(self.growth_factor);
        self.next_error_rate *= self.tightening_ratio;
        Ok(())
    }

    /// Whether `key` may have been inserted. `false` is always exact.
    pub fn contains(&self, key: &str) -> bool {
        self.layers.iter().any(|layer| layer.bloom.check(key))
    }

    /// Insert `key`. Keys already reported present are not re-added.
    pub fn insert(&mut self, key: &str) -> Result<()> {
        if self.contains(key) {
            return Ok(());
        }
        if self.layers.last().is_none_or(Layer::is_full) {
            self.push_layer()?;
        }
        if let Some(layer) = self.layers.last_mut() {
            layer.bloom.set(key);
            layer.len += 1;
            self.len += 1;
        }
        Ok(())
    }

    /// Number of distinct keys inserted (as judged by the filter).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial_capacity: usize) -> DedupConfig {
        DedupConfig {
            initial_capacity,
            ..DedupConfig::default()
        }
    }

    #[test]
    fn test_no_false_negatives_across_layers() {
        let mut filter = ScalableBloom::new(&config(8)).unwrap();
        let keys: Vec<String> = (0..200).map(|i| format!("movie-{i}")).collect();
        for key in &keys {
            filter.insert(key).unwrap();
        }

        assert!(filter.layer_count() > 1);
        assert!(keys.iter().all(|k| filter.contains(k)));
    }

    #[test]
    fn test_empty_filter_contains_nothing() {
        let filter = ScalableBloom::new(&config(100)).unwrap();
        assert!(filter.is_empty());
        assert!(!filter.contains("Arrival"));
    }

    #[test]
    fn test_false_positive_rate_stays_bounded() {
        let mut filter = ScalableBloom::new(&config(50)).unwrap();
        for i in 0..1000 {
            filter.insert(&format!("seen-{i}")).unwrap();
        }

        let false_positives = (0..10_000)
            .filter(|i| filter.contains(&format!("unseen-{i}")))
            .count();
        // Configured bound is 0.1%; allow generous slack for randomness.
        assert!(false_positives < 100, "{false_positives} false positives");
    }

    #[test]
    fn test_duplicate_insert_not_counted() {
        let mut filter = ScalableBloom::new(&config(10)).unwrap();
        filter.insert("Dune").unwrap();
        filter.insert("Dune").unwrap();
        assert_eq!(filter.len(), 1);
    }
}
