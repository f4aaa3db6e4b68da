//! Provider metrics for observability
//!
//! Counters describing how many messages went through the provider queue and
//! what happened to them at the sink.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for provider observability
///
/// # Example
///
/// ```
/// use rust_sink_logging::ProviderMetrics;
///
/// let metrics = ProviderMetrics::new();
///
/// metrics.record_pushed();
/// metrics.record_delivered(1);
///
/// assert_eq!(metrics.pushed(), 1);
/// assert_eq!(metrics.delivered(), 1);
/// ```
#[derive(Debug)]
pub struct ProviderMetrics {
    /// Messages accepted by the queue
    pushed: AtomicU64,

    /// Messages handed to the sink without error
    delivered: AtomicU64,

    /// Messages that were part of a failed delivery
    failed: AtomicU64,

    /// Messages rejected because the provider was disposed or its worker died
    dropped: AtomicU64,

    /// Bulk flushes performed
    batches: AtomicU64,
}

impl ProviderMetrics {
    pub const fn new() -> Self {
        Self {
            pushed: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            batches: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pushed(&self) -> u64 {
        self.pushed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self, count: u64) -> u64 {
        self.delivered.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self, count: u64) -> u64 {
        self.failed.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_batch(&self) -> u64 {
        self.batches.fetch_add(1, Ordering::Relaxed)
    }

    /// Messages still waiting in the queue or being delivered.
    pub fn in_flight(&self) -> u64 {
        self.pushed()
            .saturating_sub(self.delivered() + self.failed())
    }

    /// Share of messages that never reached the sink, as a percentage.
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn drop_rate(&self) -> f64 {
        let lost = self.dropped() + self.failed();
        let total = self.pushed() + self.dropped();
        if total == 0 {
            0.0
        } else {
            (lost as f64 / total as f64) * 100.0
        }
    }

    pub fn reset(&self) {
        self.pushed.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.batches.store(0, Ordering::Relaxed);
    }
}

impl Default for ProviderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = ProviderMetrics::new();
        for _ in 0..10 {
            metrics.record_pushed();
        }
        metrics.record_delivered(7);
        metrics.record_failed(2);
        metrics.record_batch();

        assert_eq!(metrics.pushed(), 10);
        assert_eq!(metrics.delivered(), 7);
        assert_eq!(metrics.failed(), 2);
        assert_eq!(metrics.in_flight(), 1);
        assert_eq!(metrics.batches(), 1);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = ProviderMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_pushed();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }

        let rate = metrics.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_reset() {
        let metrics = ProviderMetrics::new();
        metrics.record_pushed();
        metrics.record_dropped();
        metrics.reset();
        assert_eq!(metrics.pushed(), 0);
        assert_eq!(metrics.dropped(), 0);
    }
}
