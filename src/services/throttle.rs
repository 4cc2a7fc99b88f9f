// src/services/throttle.rs

//! Randomised politeness delay between detail fetches, and the shared gate
//! that spaces out requests from concurrent workers.

use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::CrawlerConfig;

/// Outcome of a politeness pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    Elapsed,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    min_ms: u64,
    max_ms: u64,
}

impl Throttle {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    /// A uniformly random delay within the configured bounds.
    pub fn next_delay(&self) -> Duration {
        let ms = if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            rand::rng().random_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }

    /// Sleep for one delay, returning early when `cancel` fires.
    pub async fn pause(&self, cancel: &CancellationToken) -> Pause {
        let delay = self.next_delay();
        if delay.is_zero() {
            return Pause::Elapsed;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Pause::Elapsed,
            _ = cancel.cancelled() => Pause::Cancelled,
        }
    }
}

/// Minimum interval between request starts, shared by all workers.
///
/// Callers reserve the next free slot under the lock and sleep until that
/// slot with the lock released.
#[derive(Debug)]
pub struct RequestGate {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Gate spaced by the configured minimum delay.
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(Duration::from_millis(
            config.min_delay_ms.min(config.max_delay_ms),
        ))
    }

    /// Wait for this caller's slot, returning early when `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Pause {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.interval);
            slot
        };

        if slot <= Instant::now() {
            return Pause::Elapsed;
        }
        tokio::select! {
            _ = tokio::time::sleep_until(slot) => Pause::Elapsed,
            _ = cancel.cancelled() => Pause::Cancelled,
        }
    }
}
