//! JSON formatter: one object per line

use super::{FormatBuffer, Formatter};
use crate::core::log_record::LogRecord;
use crate::core::timestamp::{TimeZone, TimestampFormat};
use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 10] = [
    "timestamp",
    "level",
    "logger",
    "message",
    "thread_id",
    "thread_name",
    "sequence",
    "file",
    "line",
    "module_path",
];

/// Machine-readable formatter
///
/// Structured fields are flattened into the top-level object. A field whose
/// key collides with a record key is written as `fields.<key>`.
///
/// Example output:
/// `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","logger":"api","message":"Request processed","thread_id":1,"sequence":7,"user":"bob"}`
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    timestamp_format: TimestampFormat,
    zone: TimeZone,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_time_zone(mut self, zone: TimeZone) -> Self {
        self.zone = zone;
        self
    }

    /// Build the JSON object for one record
    pub fn to_value(&self, record: &LogRecord) -> Value {
        let mut obj = Map::new();

        obj.insert(
            "timestamp".to_string(),
            self.timestamp_format
                .to_json_value(&record.timestamp, self.zone),
        );
        obj.insert(
            "level".to_string(),
            Value::String(record.level.to_str().to_string()),
        );
        obj.insert(
            "logger".to_string(),
            Value::String(record.logger_name.to_string()),
        );
        obj.insert("message".to_string(), Value::String(record.message.clone()));
        obj.insert("thread_id".to_string(), Value::Number(record.thread_id.into()));
        if let Some(ref name) = record.thread_name {
            obj.insert("thread_name".to_string(), Value::String(name.to_string()));
        }
        obj.insert("sequence".to_string(), Value::Number(record.sequence.into()));

        if let Some(ref source) = record.source {
            obj.insert("file".to_string(), Value::String(source.file.to_string()));
            obj.insert("line".to_string(), Value::Number(source.line.into()));
            obj.insert(
                "module_path".to_string(),
                Value::String(source.module_path.to_string()),
            );
        }

        for (key, value) in record.fields.iter() {
            let key = if RESERVED_KEYS.contains(&key) {
                format!("fields.{}", key)
            } else {
                key.to_string()
            };
            obj.insert(key, value.to_json_value());
        }

        Value::Object(obj)
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord, dest: &mut FormatBuffer) {
        let line = serde_json::to_string(&self.to_value(record)).unwrap_or_default();
        dest.push_str(&line);
        dest.push('\n');
    }

    fn box_clone(&self) -> Box<dyn Formatter> {
        Box::new(self.clone())
    }
}
