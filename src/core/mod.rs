//! Core logger types and traits

pub mod async_queue;
pub mod backtrace;
pub mod config;
pub mod error;
pub mod error_handler;
pub mod global;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod registry;
pub mod sink;
pub mod structured_builder;
pub mod timestamp;

pub use async_queue::{
    AsyncConfig, AsyncQueue, QueueState, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use backtrace::Backtracer;
pub use config::{AsyncQueueSettings, LevelSpec, LoggingConfig, LEVEL_ENV_VAR};
pub use error::{LoggerError, Result};
pub use error_handler::{default_error_handler, ErrorHandler, SinkFailure};
pub use log_context::{ContextGuard, FieldValue, LogContext, LoggerContext};
pub use log_level::{AtomicLevel, LogLevel};
pub use log_record::{current_thread_id, LogRecord, SourceLocation};
pub use logger::{FlushStatus, Logger, LoggerBuilder, DEFAULT_FLUSH_TIMEOUT};
pub use metrics::{LoggerMetrics, QueueMetrics};
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use registry::Registry;
pub use sink::Sink;
pub use structured_builder::StructuredLogBuilder;
pub use timestamp::{TimeZone, TimestampFormat};
