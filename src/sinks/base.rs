//! State shared by every built-in sink: name, level and formatter

use crate::core::log_level::{AtomicLevel, LogLevel};
use crate::core::log_record::LogRecord;
use crate::formatter::{default_formatter, FormatBuffer, Formatter};
use parking_lot::RwLock;

/// Name, level threshold and formatter of one sink
///
/// The level is read without locking. The formatter sits behind a read-write
/// lock so a pattern change never blocks concurrent formatting for long.
pub struct SinkCore {
    name: String,
    level: AtomicLevel,
    formatter: RwLock<Box<dyn Formatter>>,
}

impl SinkCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: AtomicLevel::new(LogLevel::Trace),
            formatter: RwLock::new(default_formatter()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level.load()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level);
    }

    pub fn set_formatter(&self, formatter: Box<dyn Formatter>) {
        *self.formatter.write() = formatter;
    }

    /// Format `record` with the current formatter
    pub fn render(&self, record: &LogRecord) -> FormatBuffer {
        let mut buf = FormatBuffer::with_capacity(128 + record.message.len());
        self.formatter.read().format(record, &mut buf);
        buf
    }
}

impl std::fmt::Debug for SinkCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkCore")
            .field("name", &self.name)
            .field("level", &self.level())
            .finish()
    }
}

/// Implements the name/level/formatter methods of [`Sink`](crate::core::Sink)
/// by delegating to a `core: SinkCore` field
macro_rules! delegate_sink_core {
    () => {
        fn name(&self) -> &str {
            self.core.name()
        }

        fn level(&self) -> $crate::core::LogLevel {
            self.core.level()
        }

        fn set_level(&self, level: $crate::core::LogLevel) {
            self.core.set_level(level)
        }

        fn set_formatter(&self, formatter: Box<dyn $crate::formatter::Formatter>) {
            self.core.set_formatter(formatter)
        }
    };
}

pub(crate) use delegate_sink_core;
