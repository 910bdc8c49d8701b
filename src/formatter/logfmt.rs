//! Logfmt formatter (`key=value` pairs)

use super::{FormatBuffer, Formatter};
use crate::core::log_context::FieldValue;
use crate::core::log_record::{escape_line_breaks, LogRecord};
use crate::core::timestamp::{TimeZone, TimestampFormat};
use std::fmt::Write;

/// Key-value formatter compatible with log aggregation tools
///
/// Example output:
/// `timestamp=2025-01-08T10:30:45.123Z level=WARN logger=api message="Warning message" thread_id=1`
#[derive(Debug, Clone, Default)]
pub struct LogfmtFormatter {
    timestamp_format: TimestampFormat,
    zone: TimeZone,
}

impl LogfmtFormatter {
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

    /// Keep only characters that are safe in a bare key
    fn escape_key(key: &str) -> String {
        key.chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect()
    }

    /// Quote a value only when it contains spaces, quotes, `=` or line breaks
    fn escape_value(value: &str) -> String {
        if value.is_empty() || value.contains([' ', '"', '=', '\n', '\r', '\t']) {
            Self::quote_value(value)
        } else {
            value.to_string()
        }
    }

    fn quote_value(value: &str) -> String {
        let quoted = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escape_line_breaks(&quoted))
    }
}

impl Formatter for LogfmtFormatter {
    fn format(&self, record: &LogRecord, dest: &mut FormatBuffer) {
        let out = dest.text_mut();
        let timestamp = self.timestamp_format.format(&record.timestamp, self.zone);

        let _ = write!(
            out,
            "timestamp={} level={} logger={} message={} thread_id={}",
            Self::escape_value(&timestamp),
            record.level.to_str(),
            Self::escape_value(&record.logger_name),
            Self::quote_value(&record.message),
            record.thread_id
        );
        if let Some(ref name) = record.thread_name {
            let _ = write!(out, " thread_name={}", Self::escape_value(name));
        }
        if let Some(ref source) = record.source {
            let _ = write!(
                out,
                " file={} line={} module_path={}",
                Self::escape_value(&source.file),
                source.line,
                Self::escape_value(&source.module_path)
            );
        }

        for (key, value) in record.fields.iter() {
            let value = match value {
                FieldValue::String(s) => Self::quote_value(s),
                other => other.to_string(),
            };
            let _ = write!(out, " {}={}", Self::escape_key(key), value);
        }
        out.push('\n');
    }

    fn box_clone(&self) -> Box<dyn Formatter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_context::LogContext;
    use crate::core::log_level::LogLevel;

    fn render(record: &LogRecord) -> String {
        let mut buf = FormatBuffer::new();
        LogfmtFormatter::new().format(record, &mut buf);
        buf.into_string()
    }

    #[test]
    fn test_logfmt_format() {
        let record = LogRecord::new("api", LogLevel::Warn, "Warning message");
        let result = render(&record);

        assert!(result.contains("level=WARN"));
        assert!(result.contains("logger=api"));
        assert!(result.contains("message=\"Warning message\""));
        assert!(result.ends_with('\n'));
    }

    #[test]
    fn test_logfmt_format_with_fields() {
        let record = LogRecord::new("api", LogLevel::Debug, "Debug info").with_fields(
            LogContext::new()
                .with_field("user", "alice")
                .with_field("count", 5)
                .with_field("bad key!", true),
        );
        let result = render(&record);

        assert!(result.contains("user=\"alice\""));
        assert!(result.contains("count=5"));
        assert!(result.contains(" badkey=true"));
    }

    #[test]
    fn test_logfmt_escape_special_chars() {
        let record = LogRecord::new("api", LogLevel::Debug, "Query executed")
            .with_fields(LogContext::new().with_field("query", "SELECT * FROM users WHERE id=\"1\""));
        let result = render(&record);

        assert!(result.contains("query=\"SELECT * FROM users WHERE id=\\\"1\\\"\""));
    }

    #[test]
    fn test_logfmt_field_values_stay_on_one_line() {
        let record = LogRecord::new("api", LogLevel::Info, "login").with_fields(
            LogContext::new()
                .with_field("user", "bob\nlevel=ERROR message=\"forged\"")
                .with_field("path", "a\tb\r"),
        );
        let result = render(&record);

        assert_eq!(result.matches('\n').count(), 1);
        assert!(result.ends_with('\n'));
        assert!(result.contains(r#" user="bob\nlevel=ERROR message=\"forged\"""#));
        assert!(result.contains(r#" path="a\tb\r""#));
    }

    #[test]
    fn test_logfmt_quotes_bare_values_with_line_breaks() {
        assert_eq!(LogfmtFormatter::escape_value("plain"), "plain");
        assert_eq!(LogfmtFormatter::escape_value("two\nlines"), r#""two\nlines""#);
    }
}
