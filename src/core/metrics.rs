//! Logger and queue metrics for observability
//!
//! Provides counters for monitoring logger health: records written,
//! records lost to the async queue, sink failures, and queue pressure.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for one logger
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_logged();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records lost before reaching any sink (queue overflow or rejection)
    dropped_count: AtomicU64,

    /// Records dispatched to the sink set
    total_logged: AtomicU64,

    /// Individual sink failures reported to the error handler
    sink_errors: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_logged: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    /// Record a dropped log, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_error(&self) -> u64 {
        self.sink_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no logs have been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
        self.total_logged.store(0, Ordering::Relaxed);
        self.sink_errors.store(0, Ordering::Relaxed);
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
            dropped_count: AtomicU64::new(self.dropped_count()),
            total_logged: AtomicU64::new(self.total_logged()),
            sink_errors: AtomicU64::new(self.sink_errors()),
        }
    }
}

/// Metrics for one async queue, shared by every logger that uses it
#[derive(Debug)]
pub struct QueueMetrics {
    enqueued: AtomicU64,
    /// Incoming records discarded by `DropNewest` or an expired block timeout
    dropped_newest: AtomicU64,
    /// Queued records evicted by `DropOldest`
    overrun: AtomicU64,
    /// Producers that had to wait for space
    block_events: AtomicU64,
    block_timeouts: AtomicU64,
    /// Records refused because the queue was not running
    rejected: AtomicU64,
}

impl QueueMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dropped_newest: AtomicU64::new(0),
            overrun: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            block_timeouts: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_newest(&self) -> u64 {
        self.dropped_newest.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn overrun(&self) -> u64 {
        self.overrun.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_timeouts(&self) -> u64 {
        self.block_timeouts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Every record the queue lost, whatever the reason
    pub fn total_lost(&self) -> u64 {
        self.dropped_newest() + self.overrun() + self.rejected()
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_newest(&self) {
        self.dropped_newest.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        self.overrun.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_block(&self) {
        self.block_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_block_timeout(&self) {
        self.block_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for QueueMetrics {
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued()),
            dropped_newest: AtomicU64::new(self.dropped_newest()),
            overrun: AtomicU64::new(self.overrun()),
            block_events: AtomicU64::new(self.block_events()),
            block_timeouts: AtomicU64::new(self.block_timeouts()),
            rejected: AtomicU64::new(self.rejected()),
        }
    }
}
