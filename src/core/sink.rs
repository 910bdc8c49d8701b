//! Sink trait for log output destinations

use super::{error::Result, log_level::LogLevel, log_record::LogRecord};
use crate::formatter::Formatter;

/// A destination for formatted records
///
/// Sinks are shared between loggers and between async workers, so every
/// method takes `&self`; implementations serialize their own I/O. A sink
/// reports failures through its return value and never panics on I/O errors.
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LogLevel, LogRecord, Result, Sink};
/// use rust_sink_logger::formatter::Formatter;
/// use rust_sink_logger::sinks::SinkCore;
///
/// struct StdoutSink {
///     core: SinkCore,
/// }
///
/// impl Sink for StdoutSink {
///     fn log(&self, record: &LogRecord) -> Result<()> {
///         let line = self.core.render(record);
///         print!("{}", line.as_str());
///         Ok(())
///     }
///
///     fn flush(&self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         self.core.name()
///     }
///
///     fn level(&self) -> LogLevel {
///         self.core.level()
///     }
///
///     fn set_level(&self, level: LogLevel) {
///         self.core.set_level(level)
///     }
///
///     fn set_formatter(&self, formatter: Box<dyn Formatter>) {
///         self.core.set_formatter(formatter)
///     }
/// }
/// ```
pub trait Sink: Send + Sync {
    /// Format and write one record
    fn log(&self, record: &LogRecord) -> Result<()>;

    /// Push buffered output to the destination
    fn flush(&self) -> Result<()>;

    fn name(&self) -> &str;

    /// Minimum level this sink writes; `Trace` unless changed
    fn level(&self) -> LogLevel;

    fn set_level(&self, level: LogLevel);

    /// Replace the formatter used for subsequent records
    fn set_formatter(&self, formatter: Box<dyn Formatter>);

    #[inline]
    fn should_log(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }
}
