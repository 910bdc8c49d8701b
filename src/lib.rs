//! # Rust Sink Logger
//!
//! A low-latency logging engine: named loggers dispatch records to pluggable
//! sinks, each with its own level and formatter, either synchronously or
//! through a bounded async queue.
//!
//! ## Features
//!
//! - **Pattern Formatting**: `%`-flag patterns compiled once, plus JSON and logfmt
//! - **Sinks**: Console, file, rotating file, network, null, ring buffer and callback
//! - **Registry**: Process-wide loggers by name with a default logger
//! - **Async Queue**: Worker pool with explicit overflow policies and bounded flush
//!
//! ## Example
//!
//! ```
//! use rust_sink_logger::prelude::*;
//! use rust_sink_logger::info;
//!
//! let logger = Logger::builder()
//!     .name("app")
//!     .sink(ConsoleSink::new())
//!     .pattern("[%H:%M:%S.%e] [%n] [%^%l%$] %v")
//!     .build()
//!     .unwrap();
//!
//! info!(logger, "listening on port {}", 8080);
//! ```

pub mod core;
pub mod formatter;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AsyncConfig, AsyncQueue, ErrorHandler, FieldValue, FlushStatus, LevelSpec, LogContext,
        LogLevel, LogRecord, Logger, LoggerBuilder, LoggerError, LoggingConfig, OverflowPolicy,
        Registry, Result, Sink, SinkFailure, SourceLocation, TimeZone, TimestampFormat,
    };
    pub use crate::formatter::{Formatter, JsonFormatter, LogfmtFormatter, PatternFormatter};
    pub use crate::sinks::{
        CallbackSink, ConsoleSink, ConsoleTarget, DistSink, DupFilterSink, FileSink, NetworkSink,
        NullSink, RingBufferSink, RotatingFileSink, RotationPolicy, RotationStrategy,
        SharedBuffer, WriterSink,
    };
}

pub use crate::core::global::{
    default_logger, drop_all, drop_logger, flush_every, get, get_or_create, register, registry,
    set_default_logger, set_level, shutdown,
};
pub use crate::core::{
    FlushStatus, LogLevel, Logger, LoggerBuilder, LoggerError, OverflowPolicy, Registry, Result,
    Sink,
};
