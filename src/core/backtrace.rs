//! Ring of recent records kept for on-demand dumps

use super::log_record::LogRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Keeps the last `capacity` records of every level while enabled
///
/// A logger pushes each record here before its level check, so a dump can
/// show the debug detail leading up to an error even when the logger runs at
/// a higher threshold.
#[derive(Debug, Default)]
pub struct Backtracer {
    enabled: AtomicBool,
    ring: Mutex<BacktraceRing>,
}

#[derive(Debug, Default)]
struct BacktraceRing {
    capacity: usize,
    records: VecDeque<LogRecord>,
}

impl Backtracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start keeping the last `capacity` records; 0 disables
    pub fn enable(&self, capacity: usize) {
        let mut ring = self.ring.lock();
        ring.capacity = capacity;
        while ring.records.len() > capacity {
            ring.records.pop_front();
        }
        self.enabled.store(capacity > 0, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        let mut ring = self.ring.lock();
        ring.capacity = 0;
        ring.records.clear();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn push(&self, record: LogRecord) {
        let mut ring = self.ring.lock();
        if ring.capacity == 0 {
            return;
        }
        if ring.records.len() == ring.capacity {
            ring.records.pop_front();
        }
        ring.records.push_back(record);
    }

    /// Remove and return the kept records, oldest first
    pub fn drain(&self) -> Vec<LogRecord> {
        self.ring.lock().records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;

    fn record(msg: &str) -> LogRecord {
        LogRecord::new("svc", LogLevel::Debug, msg)
    }

    #[test]
    fn test_keeps_last_n() {
        let tracer = Backtracer::new();
        tracer.enable(2);
        for msg in ["a", "b", "c"] {
            tracer.push(record(msg));
        }

        let messages: Vec<_> = tracer.drain().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["b", "c"]);
        assert!(tracer.is_empty());
    }

    #[test]
    fn test_disabled_keeps_nothing() {
        let tracer = Backtracer::new();
        assert!(!tracer.is_enabled());
        tracer.push(record("ignored"));
        assert!(tracer.is_empty());

        tracer.enable(4);
        tracer.push(record("kept"));
        tracer.disable();
        assert!(tracer.is_empty());
        assert!(!tracer.is_enabled());
    }

    #[test]
    fn test_shrinking_capacity_drops_oldest() {
        let tracer = Backtracer::new();
        tracer.enable(3);
        for msg in ["a", "b", "c"] {
            tracer.push(record(msg));
        }
        tracer.enable(1);
        assert_eq!(tracer.drain()[0].message, "c");
    }
}
