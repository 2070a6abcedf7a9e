//! Logger metrics for observability
//!
//! Counters describing the record pipeline: how many records were queued,
//! written and dropped, how flushes went, and how many engines came and went.

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_METRICS: LoggerMetrics = LoggerMetrics::new();

/// Process-wide pipeline metrics.
pub fn global() -> &'static LoggerMetrics {
    &GLOBAL_METRICS
}

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use hotswap_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_enqueued();
/// metrics.record_written();
///
/// assert_eq!(metrics.records_enqueued(), 1);
/// assert_eq!(metrics.records_written(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to an appender queue
    records_enqueued: AtomicU64,

    /// Records formatted and written into a sink
    records_written: AtomicU64,

    /// Records that reached an appender whose worker already exited
    records_dropped: AtomicU64,

    /// Buffer flushes that reached the sink
    flushes: AtomicU64,

    /// Flushes that exhausted their retry budget
    flush_failures: AtomicU64,

    engines_started: AtomicU64,
    engines_closed: AtomicU64,

    /// Successful configuration reloads
    reloads: AtomicU64,

    /// Reloads rejected by validation or I/O
    reload_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_enqueued: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            engines_started: AtomicU64::new(0),
            engines_closed: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
            reload_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_enqueued(&self) -> u64 {
        self.records_enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn engines_started(&self) -> u64 {
        self.engines_started.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn engines_closed(&self) -> u64 {
        self.engines_closed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reload_failures(&self) -> u64 {
        self.reload_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.records_enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.records_written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.records_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flushes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush_failure(&self) -> u64 {
        self.flush_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_engine_started(&self) -> u64 {
        self.engines_started.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_engine_closed(&self) -> u64 {
        self.engines_closed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_reload(&self) -> u64 {
        self.reloads.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_reload_failure(&self) -> u64 {
        self.reload_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been enqueued or dropped.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.records_dropped() as f64;
        let total = self.records_enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_enqueued.store(0, Ordering::Relaxed);
        self.records_written.store(0, Ordering::Relaxed);
        self.records_dropped.store(0, Ordering::Relaxed);
        self.flushes.store(0, Ordering::Relaxed);
        self.flush_failures.store(0, Ordering::Relaxed);
        self.engines_started.store(0, Ordering::Relaxed);
        self.engines_closed.store(0, Ordering::Relaxed);
        self.reloads.store(0, Ordering::Relaxed);
        self.reload_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            records_enqueued: AtomicU64::new(self.records_enqueued()),
            records_written: AtomicU64::new(self.records_written()),
            records_dropped: AtomicU64::new(self.records_dropped()),
            flushes: AtomicU64::new(self.flushes()),
            flush_failures: AtomicU64::new(self.flush_failures()),
            engines_started: AtomicU64::new(self.engines_started()),
            engines_closed: AtomicU64::new(self.engines_closed()),
            reloads: AtomicU64::new(self.reloads()),
            reload_failures: AtomicU64::new(self.reload_failures()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.records_enqueued(), 0);
        assert_eq!(metrics.records_written(), 0);
        assert_eq!(metrics.records_dropped(), 0);
        assert_eq!(metrics.flushes(), 0);
        assert_eq!(metrics.reloads(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.records_dropped(), 1);
        metrics.record_dropped();
        assert_eq!(metrics.records_dropped(), 2);
    }

    #[test]
    fn test_metrics_drop_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_enqueued();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }

        let rate = metrics.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = LoggerMetrics::new();
        metrics.record_flush();
        metrics.record_flush_failure();
        metrics.record_reload();

        metrics.reset();

        assert_eq!(metrics.flushes(), 0);
        assert_eq!(metrics.flush_failures(), 0);
        assert_eq!(metrics.reloads(), 0);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = LoggerMetrics::new();
        metrics.record_written();

        let snapshot = metrics.clone();
        metrics.record_written();

        assert_eq!(snapshot.records_written(), 1);
        assert_eq!(metrics.records_written(), 2);
    }
}
