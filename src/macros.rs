//! Logging macros with `format!`-style arguments and call-site capture
//!
//! Each macro checks the logger's level before formatting, so a filtered
//! call never builds its message. The first argument is either a format
//! string, which logs to the global default logger, or a logger expression.
//!
//! # Examples
//!
//! ```
//! use rust_sink_logger::prelude::*;
//! use rust_sink_logger::info;
//!
//! let logger = Logger::new("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // Through the default logger
//! info!("User {} logged in", 42);
//! ```

/// Log a message at a given level.
///
/// # Examples
///
/// ```
/// # use rust_sink_logger::prelude::*;
/// # let logger = Logger::new("svc");
/// use rust_sink_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(LogLevel::Warn, "to the default logger");
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $fmt:literal $($arg:tt)*) => {{
        if let Some(logger) = $crate::default_logger() {
            $crate::log!(logger, $level, $fmt $($arg)*);
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level: $crate::LogLevel = $level;
        if logger.should_capture(level) {
            logger.log_at(
                level,
                $crate::core::SourceLocation::new(file!(), line!(), module_path!()),
                format!($($arg)+),
            );
        }
    }};
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_sink_logger::prelude::*;
/// # let logger = Logger::new("svc");
/// # logger.set_level(LogLevel::Trace);
/// use rust_sink_logger::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::LogLevel::Trace, $fmt $($arg)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::LogLevel::Debug, $fmt $($arg)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_sink_logger::prelude::*;
/// # let logger = Logger::new("svc");
/// use rust_sink_logger::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::LogLevel::Info, $fmt $($arg)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::LogLevel::Warn, $fmt $($arg)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_sink_logger::prelude::*;
/// # let logger = Logger::new("svc");
/// use rust_sink_logger::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::LogLevel::Error, $fmt $($arg)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::LogLevel::Critical, $fmt $($arg)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, LogRecord, Logger, Sink};
    use crate::sinks::{CallbackSink, RingBufferSink};
    use parking_lot::Mutex;
    use std::cell::Cell;
    use std::fmt;
    use std::sync::Arc;

    fn ring_logger(level: LogLevel) -> (Logger, Arc<RingBufferSink>) {
        let sink = Arc::new(RingBufferSink::new(16));
        let logger = Logger::builder()
            .name("macros")
            .level(level)
            .sinks([sink.clone() as Arc<dyn Sink>])
            .pattern("%L %v")
            .build()
            .unwrap();
        (logger, sink)
    }

    #[test]
    fn test_level_macros() {
        let (logger, sink) = ring_logger(LogLevel::Trace);

        trace!(logger, "t {}", 1);
        debug!(logger, "d {}", 2);
        info!(logger, "i {}", 3);
        warn!(logger, "w");
        error!(logger, "e {code}", code = 500);
        critical!(logger, "c");
        log!(logger, LogLevel::Info, "plain");

        assert_eq!(
            sink.last(7),
            vec!["T t 1", "D d 2", "I i 3", "W w", "E e 500", "C c", "I plain"]
        );
    }

    #[test]
    fn test_filtered_macro_skips_formatting() {
        struct Counted<'a>(&'a Cell<u32>);

        impl fmt::Display for Counted<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.set(self.0.get() + 1);
                write!(f, "counted")
            }
        }

        let (logger, sink) = ring_logger(LogLevel::Error);
        let formats = Cell::new(0);

        debug!(logger, "{}", Counted(&formats));
        assert_eq!(formats.get(), 0);
        assert!(sink.is_empty());

        error!(logger, "{}", Counted(&formats));
        assert_eq!(formats.get(), 1);
    }

    #[test]
    fn test_macro_captures_call_site() {
        let seen: Arc<Mutex<Option<LogRecord>>> = Arc::new(Mutex::new(None));
        let sink_seen = seen.clone();
        let logger = Arc::new(
            Logger::builder()
                .sink(CallbackSink::new(move |record, _| {
                    *sink_seen.lock() = Some(record.clone());
                }))
                .build()
                .unwrap(),
        );

        let line = line!() + 1;
        info!(logger, "here");

        let record = seen.lock().clone().unwrap();
        let source = record.source.unwrap();
        assert_eq!(source.file_name(), "macros.rs");
        assert_eq!(source.line, line);
        assert!(source.module_path.ends_with("macros::tests"));
    }
}
