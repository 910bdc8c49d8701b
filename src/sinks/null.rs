//! Sink that discards everything

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogRecord, Result, Sink};
use std::sync::atomic::{AtomicU64, Ordering};

/// Discards records, counting how many it received
///
/// Useful for benchmarks and for measuring dispatch overhead.
#[derive(Debug)]
pub struct NullSink {
    core: SinkCore,
    received: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            core: SinkCore::new("null"),
            received: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    pub fn count(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for NullSink {
    fn log(&self, _record: &LogRecord) -> Result<()> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    delegate_sink_core!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    #[test]
    fn test_null_sink_counts() {
        let sink = NullSink::new();
        for _ in 0..3 {
            sink.log(&LogRecord::new("svc", LogLevel::Debug, "x")).unwrap();
        }
        assert_eq!(sink.count(), 3);
        assert_eq!(sink.name(), "null");
    }
}
