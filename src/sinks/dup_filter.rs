//! Sink that suppresses repeated messages

use super::dist::DistSink;
use crate::core::{LogLevel, LogRecord, Result, Sink};
use crate::formatter::Formatter;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct DupState {
    last_time: Option<DateTime<Utc>>,
    last_message: String,
    skipped: usize,
}

/// Drops a message equal to the previous one when it arrives within
/// `max_skip_duration`, then reports how many were dropped
///
/// Records are forwarded to child sinks like a [`DistSink`]. Once a different
/// message arrives, the children first receive a notice
/// `"<n> duplicate messages.."` at the new record's level, then the record.
/// The window is measured between consecutive record timestamps, so a
/// steady stream of duplicates keeps being dropped.
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LogLevel, LogRecord, Sink};
/// use rust_sink_logger::formatter::PatternFormatter;
/// use rust_sink_logger::sinks::{DupFilterSink, RingBufferSink};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let ring = Arc::new(RingBufferSink::new(8));
/// let sink = DupFilterSink::new(Duration::from_secs(5));
/// sink.add_sink(ring.clone());
/// sink.set_formatter(Box::new(PatternFormatter::new("%v").unwrap()));
///
/// for msg in ["retrying", "retrying", "retrying", "connected"] {
///     sink.log(&LogRecord::new("net", LogLevel::Info, msg)).unwrap();
/// }
/// assert_eq!(ring.last(8), vec!["retrying", "2 duplicate messages..", "connected"]);
/// ```
pub struct DupFilterSink {
    dist: DistSink,
    max_skip_duration: Duration,
    state: Mutex<DupState>,
}

impl DupFilterSink {
    pub fn new(max_skip_duration: Duration) -> Self {
        Self {
            dist: DistSink::new().with_name("dup_filter"),
            max_skip_duration,
            state: Mutex::new(DupState::default()),
        }
    }

    pub fn with_sinks<I>(max_skip_duration: Duration, sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Sink>>,
    {
        let sink = Self::new(max_skip_duration);
        sink.dist.set_sinks(sinks);
        sink
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.dist = self.dist.with_name(name);
        self
    }

    pub fn max_skip_duration(&self) -> Duration {
        self.max_skip_duration
    }

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.dist.add_sink(sink);
    }

    pub fn remove_sink(&self, sink: &Arc<dyn Sink>) -> bool {
        self.dist.remove_sink(sink)
    }

    pub fn set_sinks<I>(&self, sinks: I)
    where
        I: IntoIterator<Item = Arc<dyn Sink>>,
    {
        self.dist.set_sinks(sinks);
    }

    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.dist.sinks()
    }

    fn is_duplicate(&self, state: &DupState, record: &LogRecord) -> bool {
        let Some(last_time) = state.last_time else {
            return false;
        };
        if state.last_message != record.message {
            return false;
        }
        // Out-of-order timestamps count as inside the window
        match record.timestamp.signed_duration_since(last_time).to_std() {
            Ok(delta) => delta < self.max_skip_duration,
            Err(_) => true,
        }
    }
}

impl Sink for DupFilterSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let mut state = self.state.lock();
        let duplicate = self.is_duplicate(&state, record);
        state.last_time = Some(record.timestamp);
        if duplicate {
            state.skipped += 1;
            return Ok(());
        }

        let mut notice_result = Ok(());
        if state.skipped > 0 {
            let notice = LogRecord::new(
                Arc::clone(&record.logger_name),
                record.level,
                format!("{} duplicate messages..", state.skipped),
            )
            .with_timestamp(record.timestamp);
            notice_result = self.dist.log(&notice);
            state.skipped = 0;
        }

        state.last_message.clone_from(&record.message);
        let result = self.dist.log(record);
        notice_result.and(result)
    }

    fn flush(&self) -> Result<()> {
        self.dist.flush()
    }

    fn name(&self) -> &str {
        self.dist.name()
    }

    fn level(&self) -> LogLevel {
        self.dist.level()
    }

    fn set_level(&self, level: LogLevel) {
        self.dist.set_level(level)
    }

    fn set_formatter(&self, formatter: Box<dyn Formatter>) {
        self.dist.set_formatter(formatter)
    }
}
