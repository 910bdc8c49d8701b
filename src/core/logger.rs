//! Named logger: level filtering and dispatch to sinks

use super::async_queue::{AsyncConfig, AsyncQueue, InFlight};
use super::backtrace::Backtracer;
use super::error::{LoggerError, Result};
use super::error_handler::{self, default_error_handler, panic_message, ErrorHandler, SinkFailure};
use super::log_context::{ContextGuard, FieldValue, LogContext, LoggerContext};
use super::log_level::{AtomicLevel, LogLevel};
use super::log_record::{LogRecord, SourceLocation};
use super::metrics::LoggerMetrics;
use super::overflow_policy::{OverflowCallback, OverflowPolicy};
use super::sink::Sink;
use crate::formatter::{Formatter, PatternFormatter};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default bound on how long `flush()` waits
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

const BACKTRACE_START: &str = "****************** Backtrace Start ******************";
const BACKTRACE_END: &str = "****************** Backtrace End ********************";

/// Outcome of a flush
///
/// A flush never fails loudly: sink errors still go to the error handler, and
/// the status tells the caller whether every sink confirmed its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushStatus {
    /// Every sink flushed
    Complete,
    /// Some sinks returned an error
    Degraded { failed_sinks: Vec<String> },
    /// The flush did not finish within the allowed time
    TimedOut { waited: Duration },
}

impl FlushStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, FlushStatus::Complete)
    }
}

/// The part of a logger that async workers need: name, sinks and error handling
pub(crate) struct LoggerCore {
    name: Arc<str>,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    error_handler: RwLock<ErrorHandler>,
    flush_level: AtomicLevel,
    metrics: LoggerMetrics,
    in_flight: InFlight,
}

impl LoggerCore {
    fn new(name: Arc<str>) -> Self {
        Self {
            name,
            sinks: RwLock::new(Vec::new()),
            error_handler: RwLock::new(default_error_handler()),
            flush_level: AtomicLevel::new(LogLevel::Off),
            metrics: LoggerMetrics::new(),
            in_flight: InFlight::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub(crate) fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Write `record` to every sink whose level admits it, in attach order
    pub(crate) fn dispatch(&self, record: &LogRecord) {
        let mut failures: Vec<(String, LoggerError)> = Vec::new();
        {
            let sinks = self.sinks.read();
            for sink in sinks.iter() {
                if !sink.should_log(record.level) {
                    continue;
                }
                if let Err(e) = guarded(sink.as_ref(), || sink.log(record)) {
                    failures.push((sink.name().to_string(), e));
                }
            }
        }
        for (sink, error) in &failures {
            self.report(sink, error);
        }

        self.metrics.record_logged();
        if self.flush_level.allows(record.level) {
            self.flush_sinks();
        }
    }

    pub(crate) fn flush_sinks(&self) -> FlushStatus {
        let mut failures: Vec<(String, LoggerError)> = Vec::new();
        {
            let sinks = self.sinks.read();
            for sink in sinks.iter() {
                if let Err(e) = guarded(sink.as_ref(), || sink.flush()) {
                    failures.push((sink.name().to_string(), e));
                }
            }
        }
        if failures.is_empty() {
            return FlushStatus::Complete;
        }

        for (sink, error) in &failures {
            self.report(sink, error);
        }
        FlushStatus::Degraded {
            failed_sinks: failures.into_iter().map(|(sink, _)| sink).collect(),
        }
    }

    /// Count a sink failure and hand it to the error handler
    pub(crate) fn report(&self, sink: &str, error: &LoggerError) {
        self.metrics.record_sink_error();
        self.notify(sink, error);
    }

    /// Count a record lost before reaching any sink and report why
    pub(crate) fn report_dropped(&self, error: &LoggerError) {
        self.metrics.record_dropped();
        self.notify("", error);
    }

    fn notify(&self, sink: &str, error: &LoggerError) {
        let handler = self.error_handler.read().clone();
        error_handler::report(
            &handler,
            &SinkFailure {
                logger: &self.name,
                sink,
                error,
            },
        );
    }
}

/// Run one sink call, turning a panic into an error
fn guarded(sink: &dyn Sink, call: impl FnOnce() -> Result<()>) -> Result<()> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(panic) => Err(LoggerError::sink_panicked(
            sink.name(),
            panic_message(panic.as_ref()),
        )),
    }
}

enum Dispatch {
    Sync,
    Async(Arc<AsyncQueue>),
}

/// A named, leveled dispatcher of records to its sinks
///
/// The level check is a relaxed atomic load, so a filtered call costs no lock
/// and no allocation. Sinks run in the order they were attached.
///
/// # Example
///
/// ```
/// use rust_sink_logger::prelude::*;
///
/// let buffer = SharedBuffer::new();
/// let logger = Logger::builder()
///     .name("svc")
///     .level(LogLevel::Warn)
///     .sink(WriterSink::new(buffer.clone()))
///     .pattern("%l %v")
///     .build()
///     .unwrap();
///
/// logger.info("x");
/// logger.error("y");
///
/// assert_eq!(buffer.lines(), vec!["error y"]);
/// ```
pub struct Logger {
    core: Arc<LoggerCore>,
    level: AtomicLevel,
    sequence: AtomicU64,
    context: LoggerContext,
    backtrace: Backtracer,
    dispatch: Dispatch,
}

impl Logger {
    /// Create a synchronous logger at `Info` with no sinks
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_dispatch(name.into(), Dispatch::Sync)
    }

    fn with_dispatch(name: Arc<str>, dispatch: Dispatch) -> Self {
        Self {
            core: Arc::new(LoggerCore::new(name)),
            level: AtomicLevel::new(LogLevel::Info),
            sequence: AtomicU64::new(0),
            context: LoggerContext::new(),
            backtrace: Backtracer::new(),
            dispatch,
        }
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_sink_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .name("worker")
    ///     .level(LogLevel::Debug)
    ///     .async_mode(1000)
    ///     .build()
    ///     .unwrap();
    /// assert!(logger.is_async());
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn level(&self) -> LogLevel {
        self.level.load()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level);
    }

    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        self.level.allows(level)
    }

    /// True when a record at `level` would be dispatched or kept for a backtrace
    ///
    /// The logging macros check this before formatting their arguments.
    #[inline]
    pub fn should_capture(&self, level: LogLevel) -> bool {
        self.should_log(level) || self.backtrace.is_enabled()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.should_capture(level) {
            return;
        }
        self.submit(level, message.into(), LogContext::new(), None);
    }

    pub fn log_with_fields(&self, level: LogLevel, message: impl Into<String>, fields: LogContext) {
        if !self.should_capture(level) {
            return;
        }
        self.submit(level, message.into(), fields, None);
    }

    /// Log with the call site attached; used by the logging macros
    pub fn log_at(&self, level: LogLevel, source: SourceLocation, message: impl Into<String>) {
        if !self.should_capture(level) {
            return;
        }
        self.submit(level, message.into(), LogContext::new(), Some(source));
    }

    pub(crate) fn log_parts(
        &self,
        level: LogLevel,
        message: String,
        fields: LogContext,
        source: Option<SourceLocation>,
    ) {
        if !self.should_capture(level) {
            return;
        }
        self.submit(level, message, fields, source);
    }

    fn submit(
        &self,
        level: LogLevel,
        message: String,
        mut fields: LogContext,
        source: Option<SourceLocation>,
    ) {
        self.context.merge_into(&mut fields);
        let mut record = self.record(level, message).with_fields(fields);
        record.source = source;

        if self.backtrace.is_enabled() {
            self.backtrace.push(record.clone());
        }
        if self.should_log(level) {
            self.emit(record);
        }
    }

    fn record(&self, level: LogLevel, message: impl Into<String>) -> LogRecord {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        LogRecord::new(Arc::clone(&self.core.name), level, message).with_sequence(sequence)
    }

    fn emit(&self, record: LogRecord) {
        match &self.dispatch {
            Dispatch::Sync => self.core.dispatch(&record),
            Dispatch::Async(queue) => queue.enqueue(&self.core, record),
        }
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    pub fn trace_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Trace, message, fields);
    }

    pub fn debug_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Debug, message, fields);
    }

    pub fn info_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Info, message, fields);
    }

    pub fn warn_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Warn, message, fields);
    }

    pub fn error_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Error, message, fields);
    }

    pub fn critical_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Critical, message, fields);
    }

    /// Attach a sink after the existing ones
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.core.sinks.write().push(sink);
    }

    /// Detach every sink called `name`; returns whether one was attached
    pub fn remove_sink(&self, name: &str) -> bool {
        let mut sinks = self.core.sinks.write();
        let before = sinks.len();
        sinks.retain(|sink| sink.name() != name);
        sinks.len() != before
    }

    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.core.sinks.read().clone()
    }

    /// Compile `pattern` and give every sink a copy
    ///
    /// A pattern that does not compile leaves all sinks untouched.
    pub fn set_pattern(&self, pattern: &str) -> Result<()> {
        let formatter = PatternFormatter::new(pattern)?;
        self.set_formatter(Box::new(formatter));
        Ok(())
    }

    pub fn set_formatter(&self, formatter: Box<dyn Formatter>) {
        for sink in self.core.sinks.read().iter() {
            sink.set_formatter(formatter.clone());
        }
    }

    /// Flush every sink after any record at or above `level`
    pub fn flush_on(&self, level: LogLevel) {
        self.core.flush_level.store(level);
    }

    pub fn flush_level(&self) -> LogLevel {
        self.core.flush_level.load()
    }

    /// Flush all sinks, waiting at most [`DEFAULT_FLUSH_TIMEOUT`]
    pub fn flush(&self) -> FlushStatus {
        self.flush_timeout(DEFAULT_FLUSH_TIMEOUT)
    }

    /// Flush all sinks
    ///
    /// In async mode this waits until every record queued before the call
    /// has been written by whichever worker took it, bounded by `timeout`.
    /// In sync mode the flush always runs to completion and reports
    /// `TimedOut` if it took longer than `timeout`; a sink failure is
    /// reported as `Degraded` first.
    pub fn flush_timeout(&self, timeout: Duration) -> FlushStatus {
        match &self.dispatch {
            Dispatch::Sync => {
                let started = Instant::now();
                let status = self.core.flush_sinks();
                let waited = started.elapsed();
                if status.is_complete() && waited > timeout {
                    FlushStatus::TimedOut { waited }
                } else {
                    status
                }
            }
            Dispatch::Async(queue) => queue.flush(&self.core, timeout),
        }
    }

    /// Keep the last `capacity` records of every level for [`dump_backtrace`](Self::dump_backtrace)
    pub fn enable_backtrace(&self, capacity: usize) {
        self.backtrace.enable(capacity);
    }

    pub fn disable_backtrace(&self) {
        self.backtrace.disable();
    }

    pub fn backtrace_enabled(&self) -> bool {
        self.backtrace.is_enabled()
    }

    /// Emit the kept records between start and end markers
    ///
    /// The dump ignores the logger's level; each sink's own level still
    /// applies. Nothing is written when no records are kept.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let sink = Arc::new(RingBufferSink::new(16));
    /// let logger = Logger::builder()
    ///     .name("svc")
    ///     .level(LogLevel::Error)
    ///     .sinks([sink.clone() as Arc<dyn Sink>])
    ///     .pattern("%v")
    ///     .build()
    ///     .unwrap();
    ///
    /// logger.enable_backtrace(8);
    /// logger.debug("connecting");
    /// assert!(sink.is_empty());
    ///
    /// logger.dump_backtrace();
    /// assert_eq!(sink.len(), 3);
    /// ```
    pub fn dump_backtrace(&self) {
        let records = self.backtrace.drain();
        if records.is_empty() {
            return;
        }
        self.emit(self.record(LogLevel::Info, BACKTRACE_START));
        for record in records {
            self.emit(record);
        }
        self.emit(self.record(LogLevel::Info, BACKTRACE_END));
    }

    /// Persistent fields added to every record of this logger
    pub fn context(&self) -> &LoggerContext {
        &self.context
    }

    /// Add a context field until the returned guard is dropped
    pub fn scoped_field<K, V>(&self, key: K, value: V) -> ContextGuard
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.context.scoped(key, value)
    }

    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.core.error_handler.write() = handler;
    }

    /// Get logger metrics
    ///
    /// Returns counters for records logged, records dropped by the async
    /// queue and sink failures.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::Logger;
    ///
    /// let logger = Logger::new("svc");
    /// logger.info("hello");
    ///
    /// assert_eq!(logger.metrics().total_logged(), 1);
    /// assert_eq!(logger.metrics().dropped_count(), 0);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        self.core.metrics()
    }

    pub fn dropped_count(&self) -> u64 {
        self.core.metrics().dropped_count()
    }

    pub fn is_async(&self) -> bool {
        matches!(self.dispatch, Dispatch::Async(_))
    }

    /// The queue this logger submits to, in async mode
    pub fn async_queue(&self) -> Option<&Arc<AsyncQueue>> {
        match &self.dispatch {
            Dispatch::Async(queue) => Some(queue),
            Dispatch::Sync => None,
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("sinks", &self.core.sinks.read().len())
            .field("async", &self.is_async())
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Queued records keep the core alive; the queue flushes them itself.
        if let Dispatch::Sync = self.dispatch {
            self.core.flush_sinks();
        }

        let dropped = self.core.metrics().dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down with {} dropped logs (drop rate: {:.2}%)",
                self.name(),
                dropped,
                self.core.metrics().drop_rate()
            );
        }
    }
}

enum FormatSetting {
    Pattern(String),
    Formatter(Box<dyn Formatter>),
}

enum QueueSetting {
    None,
    Shared(Arc<AsyncQueue>),
    Dedicated(usize),
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_sink_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .name("ingest")
///     .level(LogLevel::Debug)
///     .sink(NullSink::new())
///     .async_mode(1000)
///     .overflow_policy(OverflowPolicy::DropOldest)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    name: String,
    level: LogLevel,
    sinks: Vec<Arc<dyn Sink>>,
    format: Option<FormatSetting>,
    flush_level: LogLevel,
    error_handler: Option<ErrorHandler>,
    queue: QueueSetting,
    overflow_policy: Option<OverflowPolicy>,
    on_overflow: Option<OverflowCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            name: String::new(),
            level: LogLevel::Info,
            sinks: Vec::new(),
            format: None,
            flush_level: LogLevel::Off,
            error_handler: None,
            queue: QueueSetting::None,
            overflow_policy: None,
            on_overflow: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the initial level threshold
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Attach a sink owned by this logger
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Attach sinks that may be shared with other loggers
    #[must_use = "builder methods return a new value"]
    pub fn sinks<I>(mut self, sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Sink>>,
    {
        self.sinks.extend(sinks);
        self
    }

    /// Format every attached sink with this pattern
    #[must_use = "builder methods return a new value"]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.format = Some(FormatSetting::Pattern(pattern.into()));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.format = Some(FormatSetting::Formatter(formatter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_level(mut self, level: LogLevel) -> Self {
        self.flush_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Submit records through an existing, shared queue
    #[must_use = "builder methods return a new value"]
    pub fn async_queue(mut self, queue: Arc<AsyncQueue>) -> Self {
        self.queue = QueueSetting::Shared(queue);
        self
    }

    /// Enable async mode with a dedicated single-worker queue of `capacity`
    ///
    /// If not called, the logger will use synchronous mode.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, capacity: usize) -> Self {
        self.queue = QueueSetting::Dedicated(capacity);
        self
    }

    /// Set the overflow policy of the dedicated queue
    ///
    /// Default is `Block`.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::prelude::*;
    /// use std::time::Duration;
    ///
    /// let logger = Logger::builder()
    ///     .async_mode(100)
    ///     .overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)))
    ///     .build()
    ///     .unwrap();
    /// ```
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = Some(policy);
        self
    }

    /// Set a callback for overflow notifications on the dedicated queue
    ///
    /// The parameter is the total count of records the queue has lost.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Build the Logger
    ///
    /// Fails when the pattern does not compile, when the queue configuration
    /// is invalid, or when queue options are given without `async_mode`.
    pub fn build(self) -> Result<Logger> {
        let formatter: Option<Box<dyn Formatter>> = match self.format {
            Some(FormatSetting::Pattern(pattern)) => Some(Box::new(PatternFormatter::new(&pattern)?)),
            Some(FormatSetting::Formatter(formatter)) => Some(formatter),
            None => None,
        };

        let queue_options = self.overflow_policy.is_some() || self.on_overflow.is_some();
        let dispatch = match self.queue {
            QueueSetting::Dedicated(capacity) => {
                let mut config = AsyncConfig::new(capacity).policy(self.overflow_policy.unwrap_or_default());
                if let Some(callback) = self.on_overflow {
                    config = config.on_overflow(callback);
                }
                Dispatch::Async(Arc::new(AsyncQueue::spawn(config)?))
            }
            _ if queue_options => {
                return Err(LoggerError::config(
                    "overflow_policy",
                    "overflow options need a dedicated queue; call async_mode(capacity)",
                ));
            }
            QueueSetting::Shared(queue) => Dispatch::Async(queue),
            QueueSetting::None => Dispatch::Sync,
        };

        let logger = Logger::with_dispatch(Arc::from(self.name), dispatch);
        logger.set_level(self.level);
        logger.flush_on(self.flush_level);
        if let Some(handler) = self.error_handler {
            logger.set_error_handler(handler);
        }
        for sink in self.sinks {
            if let Some(formatter) = &formatter {
                sink.set_formatter(formatter.clone());
            }
            logger.add_sink(sink);
        }

        Ok(logger)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{CallbackSink, NullSink, RingBufferSink, SharedBuffer, SinkCore, WriterSink};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct FailingSink {
        core: SinkCore,
        panics: bool,
        flushes_fail: bool,
    }

    impl FailingSink {
        fn new(name: &str) -> Self {
            Self {
                core: SinkCore::new(name),
                panics: false,
                flushes_fail: false,
            }
        }
    }

    impl Sink for FailingSink {
        fn log(&self, _record: &LogRecord) -> Result<()> {
            if self.panics {
                panic!("sink bug");
            }
            Err(LoggerError::writer("disk full"))
        }

        fn flush(&self) -> Result<()> {
            if self.flushes_fail {
                return Err(LoggerError::writer("flush failed"));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            self.core.name()
        }

        fn level(&self) -> LogLevel {
            self.core.level()
        }

        fn set_level(&self, level: LogLevel) {
            self.core.set_level(level)
        }

        fn set_formatter(&self, formatter: Box<dyn Formatter>) {
            self.core.set_formatter(formatter)
        }
    }

    fn buffered(name: &str, level: LogLevel, pattern: &str) -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::builder()
            .name(name)
            .level(level)
            .sink(WriterSink::new(buffer.clone()))
            .pattern(pattern)
            .build()
            .unwrap();
        (logger, buffer)
    }

    fn recording_handler() -> (ErrorHandler, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler_seen = seen.clone();
        let handler: ErrorHandler = Arc::new(move |failure: &SinkFailure<'_>| {
            handler_seen.lock().push(failure.to_string());
        });
        (handler, seen)
    }

    #[test]
    fn test_below_threshold_is_not_dispatched() {
        let (logger, buffer) = buffered("svc", LogLevel::Warn, "[%l] %v");

        logger.info("x");
        logger.error("y");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with('y'));
        assert_eq!(logger.metrics().total_logged(), 1);
    }

    #[test]
    fn test_off_disables_everything() {
        let (logger, buffer) = buffered("svc", LogLevel::Off, "%v");
        logger.critical("nope");
        logger.log(LogLevel::Off, "nope");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sink_level_filters_independently() {
        let quiet = Arc::new(RingBufferSink::new(8));
        quiet.set_level(LogLevel::Error);
        let loud = Arc::new(RingBufferSink::new(8));
        let logger = Logger::builder()
            .level(LogLevel::Trace)
            .sinks([quiet.clone() as Arc<dyn Sink>, loud.clone() as Arc<dyn Sink>])
            .build()
            .unwrap();

        logger.debug("detail");
        logger.error("failure");

        assert_eq!(quiet.len(), 1);
        assert_eq!(loud.len(), 2);
    }

    #[test]
    fn test_record_fields_win_over_context() {
        let (logger, buffer) = buffered("svc", LogLevel::Info, "%v %*");
        logger.context().set("region", "eu");
        logger.context().set("user", "context");

        logger.info_with_fields("hi", LogContext::new().with_field("user", "record"));

        let line = buffer.contents();
        assert!(line.contains("user=record"), "{}", line);
        assert!(line.contains("region=eu"), "{}", line);
        assert!(!line.contains("user=context"), "{}", line);
    }

    #[test]
    fn test_scoped_field_removed_on_drop() {
        let (logger, buffer) = buffered("svc", LogLevel::Info, "%v%*");
        {
            let _guard = logger.scoped_field("request_id", "abc");
            logger.info("inside");
        }
        logger.info("outside");

        let lines = buffer.lines();
        assert!(lines[0].contains("request_id=abc"));
        assert!(!lines[1].contains("request_id"));
    }

    #[test]
    fn test_sequence_increases_per_record() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sequences = seen.clone();
        let logger = Logger::builder()
            .sink(CallbackSink::new(move |record, _| {
                sequences.lock().push(record.sequence);
            }))
            .build()
            .unwrap();

        logger.info("a");
        logger.info("b");
        logger.info("c");

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_sink_reports_and_others_still_receive() {
        let (handler, seen) = recording_handler();
        let good = Arc::new(RingBufferSink::new(8));
        let logger = Logger::builder()
            .name("svc")
            .sinks([
                Arc::new(FailingSink::new("broken")) as Arc<dyn Sink>,
                good.clone() as Arc<dyn Sink>,
            ])
            .error_handler(handler)
            .build()
            .unwrap();

        logger.info("still delivered");

        assert_eq!(good.len(), 1);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("sink 'broken'"));
        assert!(seen[0].contains("disk full"));
        assert_eq!(logger.metrics().sink_errors(), 1);
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let (handler, seen) = recording_handler();
        let mut sink = FailingSink::new("panicky");
        sink.panics = true;
        let good = Arc::new(RingBufferSink::new(8));
        let logger = Logger::builder()
            .sinks([Arc::new(sink) as Arc<dyn Sink>, good.clone() as Arc<dyn Sink>])
            .error_handler(handler)
            .build()
            .unwrap();

        logger.warn("survives");

        assert_eq!(good.len(), 1);
        assert!(seen.lock()[0].contains("panicked"));
    }

    #[test]
    fn test_remove_sink_by_name() {
        let logger = Logger::new("svc");
        logger.add_sink(Arc::new(NullSink::new().with_name("a")));
        logger.add_sink(Arc::new(NullSink::new().with_name("b")));

        assert!(logger.remove_sink("a"));
        assert!(!logger.remove_sink("a"));
        let names: Vec<_> = logger.sinks().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_bad_pattern_leaves_sinks_untouched() {
        let (logger, buffer) = buffered("svc", LogLevel::Info, "%v");

        let err = logger.set_pattern("%Q").unwrap_err();
        assert!(err.is_configuration_error());
        logger.info("plain");

        assert_eq!(buffer.lines(), vec!["plain"]);
    }

    #[test]
    fn test_set_pattern_applies_to_every_sink() {
        let first = Arc::new(RingBufferSink::new(4));
        let second = Arc::new(RingBufferSink::new(4));
        let logger = Logger::builder()
            .name("svc")
            .sinks([first.clone() as Arc<dyn Sink>, second.clone() as Arc<dyn Sink>])
            .build()
            .unwrap();

        logger.set_pattern("%n|%L|%v").unwrap();
        logger.info("m");

        assert_eq!(first.last(1), vec!["svc|I|m"]);
        assert_eq!(second.last(1), vec!["svc|I|m"]);
    }

    #[test]
    fn test_builder_rejects_bad_pattern() {
        let result = Logger::builder().pattern("%").build();
        assert!(matches!(result, Err(LoggerError::InvalidPattern { .. })));
    }

    #[test]
    fn test_builder_rejects_policy_without_dedicated_queue() {
        let result = Logger::builder()
            .overflow_policy(OverflowPolicy::DropNewest)
            .build();
        assert!(matches!(
            result,
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        assert!(Logger::builder().async_mode(0).build().is_err());
    }

    #[test]
    fn test_flush_on_level() {
        let flushes = Arc::new(AtomicUsize::new(0));

        struct CountingSink {
            core: SinkCore,
            flushes: Arc<AtomicUsize>,
        }

        impl Sink for CountingSink {
            fn log(&self, _record: &LogRecord) -> Result<()> {
                Ok(())
            }

            fn flush(&self) -> Result<()> {
                self.flushes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }

            fn name(&self) -> &str {
                self.core.name()
            }

            fn level(&self) -> LogLevel {
                self.core.level()
            }

            fn set_level(&self, level: LogLevel) {
                self.core.set_level(level)
            }

            fn set_formatter(&self, formatter: Box<dyn Formatter>) {
                self.core.set_formatter(formatter)
            }
        }

        let logger = Logger::builder()
            .sink(CountingSink {
                core: SinkCore::new("counting"),
                flushes: flushes.clone(),
            })
            .flush_level(LogLevel::Error)
            .build()
            .unwrap();

        logger.info("no flush");
        assert_eq!(flushes.load(Ordering::SeqCst), 0);
        logger.error("flush");
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sync_flush_reports_slow_sinks_as_timed_out() {
        struct SlowFlushSink {
            core: SinkCore,
        }

        impl Sink for SlowFlushSink {
            fn log(&self, _record: &LogRecord) -> Result<()> {
                Ok(())
            }

            fn flush(&self) -> Result<()> {
                std::thread::sleep(Duration::from_millis(20));
                Ok(())
            }

            fn name(&self) -> &str {
                self.core.name()
            }

            fn level(&self) -> LogLevel {
                self.core.level()
            }

            fn set_level(&self, level: LogLevel) {
                self.core.set_level(level)
            }

            fn set_formatter(&self, formatter: Box<dyn Formatter>) {
                self.core.set_formatter(formatter)
            }
        }

        let logger = Logger::builder()
            .sink(SlowFlushSink {
                core: SinkCore::new("slow"),
            })
            .build()
            .unwrap();
        logger.info("pending");

        match logger.flush_timeout(Duration::from_millis(1)) {
            FlushStatus::TimedOut { waited } => assert!(waited >= Duration::from_millis(20)),
            other => panic!("expected TimedOut, got {:?}", other),
        }
        assert!(logger.flush_timeout(Duration::from_secs(5)).is_complete());
    }

    #[test]
    fn test_flush_reports_degraded_sinks() {
        let (handler, seen) = recording_handler();
        let mut sink = FailingSink::new("flaky");
        sink.flushes_fail = true;
        let logger = Logger::builder()
            .sink(sink)
            .sink(NullSink::new())
            .error_handler(handler)
            .build()
            .unwrap();

        assert_eq!(
            logger.flush(),
            FlushStatus::Degraded {
                failed_sinks: vec!["flaky".to_string()]
            }
        );
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_flush_complete() {
        let (logger, _buffer) = buffered("svc", LogLevel::Info, "%v");
        logger.info("x");
        assert!(logger.flush().is_complete());
    }

    #[test]
    fn test_backtrace_dumps_last_records() {
        let sink = Arc::new(RingBufferSink::new(16));
        let logger = Logger::builder()
            .level(LogLevel::Error)
            .sinks([sink.clone() as Arc<dyn Sink>])
            .pattern("%v")
            .build()
            .unwrap();

        logger.enable_backtrace(2);
        logger.debug("one");
        logger.debug("two");
        logger.trace("three");
        assert!(sink.is_empty());

        logger.dump_backtrace();
        assert_eq!(
            sink.last(4),
            vec![BACKTRACE_START, "two", "three", BACKTRACE_END]
        );

        sink.clear();
        logger.dump_backtrace();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_backtrace_disabled_keeps_nothing() {
        let sink = Arc::new(RingBufferSink::new(16));
        let logger = Logger::builder()
            .level(LogLevel::Error)
            .sinks([sink.clone() as Arc<dyn Sink>])
            .build()
            .unwrap();

        logger.enable_backtrace(4);
        logger.debug("kept");
        logger.disable_backtrace();
        logger.debug("ignored");
        logger.dump_backtrace();

        assert!(sink.is_empty());
    }

    #[test]
    fn test_async_mode_delivers_on_flush() {
        let sink = Arc::new(RingBufferSink::new(128));
        let logger = Logger::builder()
            .sinks([sink.clone() as Arc<dyn Sink>])
            .pattern("%v")
            .async_mode(64)
            .build()
            .unwrap();

        for i in 0..50 {
            logger.info(format!("m{}", i));
        }
        assert!(logger.flush().is_complete());

        let lines = sink.last(50);
        assert_eq!(lines.len(), 50);
        assert_eq!(lines[0], "m0");
        assert_eq!(lines[49], "m49");
    }

    #[test]
    fn test_debug_output() {
        let logger = Logger::new("svc");
        let text = format!("{:?}", logger);
        assert!(text.contains("svc"));
        assert!(text.contains("async: false"));
    }
}
