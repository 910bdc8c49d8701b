//! Fluent construction of records with structured fields

use super::log_context::{FieldValue, LogContext};
use super::log_level::LogLevel;
use super::log_record::SourceLocation;
use super::logger::Logger;

/// Builder for one structured record
///
/// Field values are only converted when the logger would capture the
/// record, so a builder at a filtered level costs almost nothing.
///
/// # Example
///
/// ```
/// use rust_sink_logger::prelude::*;
///
/// let logger = Logger::new("http");
///
/// logger.info_builder()
///     .message("Request processed")
///     .field("user_id", 12345)
///     .field("latency_ms", 42.5)
///     .field("status", 200)
///     .log();
/// ```
pub struct StructuredLogBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    enabled: bool,
    message: String,
    fields: LogContext,
    source: Option<SourceLocation>,
}

impl<'a> StructuredLogBuilder<'a> {
    pub fn new(logger: &'a Logger, level: LogLevel) -> Self {
        Self {
            logger,
            level,
            enabled: logger.should_capture(level),
            message: String::new(),
            fields: LogContext::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        if self.enabled {
            self.message = msg.into();
        }
        self
    }

    /// Add a structured field; a repeated key replaces the earlier value
    #[must_use]
    pub fn field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        if self.enabled {
            self.fields.add_field(key, value);
        }
        self
    }

    /// Add every field of `context`
    #[must_use]
    pub fn fields(mut self, context: LogContext) -> Self {
        if self.enabled {
            for (key, value) in context.iter() {
                self.fields.add_field(key, value.clone());
            }
        }
        self
    }

    #[must_use]
    pub fn location(mut self, file: &'static str, line: u32, module_path: &'static str) -> Self {
        self.source = Some(SourceLocation::new(file, line, module_path));
        self
    }

    /// Send the record to the logger
    pub fn log(self) {
        if self.enabled {
            self.logger
                .log_parts(self.level, self.message, self.fields, self.source);
        }
    }
}

impl Logger {
    pub fn trace_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Trace)
    }

    pub fn debug_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Debug)
    }

    /// Create an info-level structured log builder
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::Logger;
    ///
    /// let logger = Logger::new("billing");
    /// logger.info_builder()
    ///     .message("Invoice sent")
    ///     .field("invoice", 1042)
    ///     .log();
    /// ```
    pub fn info_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Info)
    }

    pub fn warn_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Warn)
    }

    /// Create an error-level structured log builder
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::Logger;
    ///
    /// let logger = Logger::new("db");
    /// logger.error_builder()
    ///     .message("Database connection failed")
    ///     .field("error_code", "DB_CONN_TIMEOUT")
    ///     .field("retry_count", 3)
    ///     .log();
    /// ```
    pub fn error_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Error)
    }

    pub fn critical_builder(&self) -> StructuredLogBuilder<'_> {
        StructuredLogBuilder::new(self, LogLevel::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sink;
    use crate::sinks::{CallbackSink, RingBufferSink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn logger_with_ring(level: LogLevel) -> (Logger, Arc<RingBufferSink>) {
        let sink = Arc::new(RingBufferSink::new(16));
        let logger = Logger::builder()
            .name("svc")
            .level(level)
            .sinks([sink.clone() as Arc<dyn Sink>])
            .pattern("%L %v%*")
            .build()
            .unwrap();
        (logger, sink)
    }

    #[test]
    fn test_builder_fields_in_order() {
        let (logger, sink) = logger_with_ring(LogLevel::Trace);

        logger
            .debug_builder()
            .message("Multiple fields")
            .field("string_field", "hello")
            .field("int_field", 42)
            .field("bool_field", true)
            .log();

        assert_eq!(
            sink.last(1),
            vec!["D Multiple fields string_field=hello int_field=42 bool_field=true"]
        );
    }

    #[test]
    fn test_builder_all_levels() {
        let (logger, sink) = logger_with_ring(LogLevel::Trace);

        logger.trace_builder().message("t").log();
        logger.debug_builder().message("d").log();
        logger.info_builder().message("i").log();
        logger.warn_builder().message("w").log();
        logger.error_builder().message("e").log();
        logger.critical_builder().message("c").log();

        assert_eq!(sink.last(6), vec!["T t", "D d", "I i", "W w", "E e", "C c"]);
    }

    #[test]
    fn test_builder_merges_context() {
        let (logger, sink) = logger_with_ring(LogLevel::Info);
        let ctx = LogContext::new()
            .with_field("request_id", "abc-123")
            .with_field("user_id", 999);

        logger
            .info_builder()
            .message("With context")
            .fields(ctx)
            .field("additional", "field")
            .log();

        assert_eq!(
            sink.last(1),
            vec!["I With context request_id=abc-123 user_id=999 additional=field"]
        );
    }

    #[test]
    fn test_filtered_builder_emits_nothing() {
        let (logger, sink) = logger_with_ring(LogLevel::Warn);
        logger.info_builder().message("quiet").field("k", 1).log();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_builder_location() {
        let seen = Arc::new(Mutex::new(None));
        let sink_seen = seen.clone();
        let logger = Logger::builder()
            .sink(CallbackSink::new(move |record, _| {
                *sink_seen.lock() = record.source.clone();
            }))
            .build()
            .unwrap();

        logger
            .warn_builder()
            .message("here")
            .location("src/app.rs", 7, "app")
            .log();

        let source = seen.lock().clone().unwrap();
        assert_eq!(source.file_name(), "app.rs");
        assert_eq!(source.line, 7);
    }
}
