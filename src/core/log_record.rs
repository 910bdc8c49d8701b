//! Log record structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: Cell<u64> = const { Cell::new(0) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<Arc<str>>>> = const { RefCell::new(None) };
}

const LINE_BREAKS: [char; 3] = ['\n', '\r', '\t'];

/// Replace newlines, carriage returns and tabs with their escape sequences
pub(crate) fn escape_line_breaks(text: &str) -> Cow<'_, str> {
    if !text.contains(LINE_BREAKS) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Logical id of the calling thread, assigned on first use and unique per process
pub fn current_thread_id() -> u64 {
    THREAD_ID_CACHE.with(|cache| {
        let id = cache.get();
        if id != 0 {
            return id;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cache.set(id);
        id
    })
}

fn current_thread_name() -> Option<Arc<str>> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(Arc::from))
            .clone()
    })
}

/// Where a record was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: Cow<'static, str>,
    pub line: u32,
    pub module_path: Cow<'static, str>,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, module_path: &'static str) -> Self {
        Self {
            file: Cow::Borrowed(file),
            line,
            module_path: Cow::Borrowed(module_path),
        }
    }

    /// File name without its directories
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_ref())
    }
}

/// One log event, immutable once handed to a sink or queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger_name: Arc<str>,
    pub message: String,
    #[serde(default, skip_serializing_if = "LogContext::is_empty")]
    pub fields: LogContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    pub thread_id: u64,
    pub thread_name: Option<Arc<str>>,
    pub sequence: u64,
}

impl LogRecord {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: String) -> String {
        if !message.contains(LINE_BREAKS) {
            return message;
        }
        escape_line_breaks(&message).into_owned()
    }

    pub fn new(logger_name: impl Into<Arc<str>>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger_name: logger_name.into(),
            message: Self::sanitize_message(message.into()),
            fields: LogContext::new(),
            source: None,
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
            sequence: 0,
        }
    }

    pub fn with_fields(mut self, fields: LogContext) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_sanitized() {
        let record = LogRecord::new("svc", LogLevel::Info, "a\nb\tc\r");
        assert_eq!(record.message, "a\\nb\\tc\\r");
    }

    #[test]
    fn test_thread_id_stable_per_thread() {
        let a = LogRecord::new("svc", LogLevel::Info, "one");
        let b = LogRecord::new("svc", LogLevel::Info, "two");
        assert_eq!(a.thread_id, b.thread_id);

        let other = std::thread::spawn(|| LogRecord::new("svc", LogLevel::Info, "x").thread_id)
            .join()
            .unwrap();
        assert_ne!(other, a.thread_id);
    }

    #[test]
    fn test_thread_name_cached() {
        let name = std::thread::Builder::new()
            .name("worker-7".to_string())
            .spawn(|| LogRecord::new("svc", LogLevel::Info, "x").thread_name)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("worker-7"));
    }

    #[test]
    fn test_source_file_name() {
        let loc = SourceLocation::new("src/net/server.rs", 10, "app::net");
        assert_eq!(loc.file_name(), "server.rs");
        let loc = SourceLocation::new("main.rs", 1, "app");
        assert_eq!(loc.file_name(), "main.rs");
    }
}
