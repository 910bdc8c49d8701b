//! In-memory sink keeping the most recent lines

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogRecord, Result, Sink};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Keeps the last `capacity` formatted lines, without their line terminators
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LogLevel, LogRecord, Sink};
/// use rust_sink_logger::sinks::RingBufferSink;
///
/// let sink = RingBufferSink::new(2);
/// for msg in ["a", "b", "c"] {
///     sink.log(&LogRecord::new("svc", LogLevel::Info, msg)).unwrap();
/// }
/// assert_eq!(sink.len(), 2);
/// assert!(sink.last(1)[0].ends_with('c'));
/// ```
pub struct RingBufferSink {
    core: SinkCore,
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl RingBufferSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            core: SinkCore::new("ringbuffer"),
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Up to `n` of the newest lines, oldest first
    pub fn last(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Sink for RingBufferSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }

        let line = self.core.render(record).trimmed_line().to_string();
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    delegate_sink_core!();
}
