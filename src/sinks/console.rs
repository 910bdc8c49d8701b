//! Console sink implementation

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogLevel, LogRecord, Result, Sink};
use crate::formatter::FormatBuffer;
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

/// Stream(s) a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
    /// Error and Critical to stderr, everything else to stdout
    #[default]
    Split,
}

type BoxedWriter = Mutex<Box<dyn Write + Send>>;

pub struct ConsoleSink {
    core: SinkCore,
    target: ConsoleTarget,
    use_colors: bool,
    out: BoxedWriter,
    err: BoxedWriter,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_target(ConsoleTarget::default())
    }

    pub fn with_target(target: ConsoleTarget) -> Self {
        Self {
            core: SinkCore::new("console"),
            target,
            use_colors: true,
            out: Mutex::new(Box::new(std::io::stdout())),
            err: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Write to the given streams instead of the process's stdout and stderr
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::sinks::{ConsoleSink, SharedBuffer};
    ///
    /// let out = SharedBuffer::new();
    /// let err = SharedBuffer::new();
    /// let sink = ConsoleSink::with_writers(out.clone(), err.clone()).with_colors(false);
    /// ```
    pub fn with_writers(
        out: impl Write + Send + 'static,
        err: impl Write + Send + 'static,
    ) -> Self {
        Self {
            core: SinkCore::new("console"),
            target: ConsoleTarget::Split,
            use_colors: true,
            out: Mutex::new(Box::new(out)),
            err: Mutex::new(Box::new(err)),
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    fn stream_for(&self, level: LogLevel) -> &BoxedWriter {
        match self.target {
            ConsoleTarget::Stdout => &self.out,
            ConsoleTarget::Stderr => &self.err,
            ConsoleTarget::Split if level >= LogLevel::Error => &self.err,
            ConsoleTarget::Split => &self.out,
        }
    }

    /// Apply the level color to the marked range of the line
    fn colorize(&self, buf: &FormatBuffer, level: LogLevel) -> String {
        let text = buf.as_str();
        match buf.color_range() {
            Some(range) if self.use_colors && !range.is_empty() => format!(
                "{}{}{}",
                &text[..range.start],
                text[range.clone()].color(level.color_code()),
                &text[range.end..]
            ),
            _ => text.to_string(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let buf = self.core.render(record);
        let line = self.colorize(&buf, record.level);
        let mut stream = self.stream_for(record.level).lock();
        stream.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Flush both streams since records go to both
        self.out.lock().flush()?;
        self.err.lock().flush()?;
        Ok(())
    }

    delegate_sink_core!();
}
