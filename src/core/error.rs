//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pattern string could not be compiled
    #[error("Invalid pattern '{pattern}' at position {position}: {message}")]
    InvalidPattern {
        pattern: String,
        position: usize,
        message: String,
    },

    /// Unknown level name
    #[error("Invalid log level: '{name}'")]
    InvalidLevel { name: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A logger with this name is already registered
    #[error("Logger with name '{name}' already exists")]
    LoggerExists { name: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSink { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotation { path: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLock { path: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    Writer(String),

    /// A sink panicked while handling a record
    #[error("Sink '{sink}' panicked: {message}")]
    SinkPanicked { sink: String, message: String },

    /// Record submitted to an async queue that is not accepting work
    #[error("Async queue is not running (state: {state})")]
    QueueNotRunning { state: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a pattern compilation error
    pub fn invalid_pattern(
        pattern: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::InvalidPattern {
            pattern: pattern.into(),
            position,
            message: message.into(),
        }
    }

    /// Create an unknown level error
    pub fn invalid_level(name: impl Into<String>) -> Self {
        LoggerError::InvalidLevel { name: name.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn logger_exists(name: impl Into<String>) -> Self {
        LoggerError::LoggerExists { name: name.into() }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file lock error
    pub fn file_lock(path: impl Into<String>) -> Self {
        LoggerError::FileLock { path: path.into() }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::Writer(msg.into())
    }

    pub fn sink_panicked(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkPanicked {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn queue_not_running(state: impl std::fmt::Display) -> Self {
        LoggerError::QueueNotRunning {
            state: state.to_string(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error comes from bad setup rather than a runtime failure
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidPattern { .. }
                | LoggerError::InvalidLevel { .. }
                | LoggerError::InvalidConfiguration { .. }
                | LoggerError::LoggerExists { .. }
        )
    }
}
