//! Timestamp formatting utilities
//!
//! Timestamps are captured in UTC. Formatters choose the zone they render in
//! with [`TimeZone`] and, for JSON and logfmt output, the layout with
//! [`TimestampFormat`].

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Zone a formatter renders wall-clock fields in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZone {
    #[default]
    Utc,
    Local,
}

/// Standardized timestamp format options
///
/// Supports the layouts commonly expected by log aggregation tools.
///
/// # Examples
///
/// ```
/// use rust_sink_logger::core::{TimeZone, TimestampFormat};
/// use chrono::Utc;
///
/// let format = TimestampFormat::Iso8601;
/// let timestamp = format.format(&Utc::now(), TimeZone::Utc);
/// assert!(timestamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// ISO 8601 with microseconds: `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,

    /// RFC 3339 format: `2025-01-08T10:30:45.123+00:00`
    Rfc3339,

    /// Unix timestamp in seconds: `1736332245`
    Unix,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Unix timestamp in microseconds: `1736332245123456`
    UnixMicros,

    /// Custom strftime format
    ///
    /// ```
    /// use rust_sink_logger::core::TimestampFormat;
    ///
    /// // Apache log format
    /// let format = TimestampFormat::Custom("%d/%b/%Y:%H:%M:%S %z".to_string());
    /// ```
    Custom(String),
}

impl TimestampFormat {
    /// Render `datetime` in the given zone
    ///
    /// The ISO 8601 layouts always carry a `Z` suffix and are therefore
    /// rendered in UTC whatever the zone.
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>, zone: TimeZone) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => match zone {
                TimeZone::Utc => datetime.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
                TimeZone::Local => datetime
                    .with_timezone(&Local)
                    .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
                    .to_string(),
            },
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::UnixMicros => datetime.timestamp_micros().to_string(),
            TimestampFormat::Custom(format_str) => match zone {
                TimeZone::Utc => render_strftime(datetime.format(format_str), format_str),
                TimeZone::Local => {
                    render_strftime(datetime.with_timezone(&Local).format(format_str), format_str)
                }
            },
        }
    }

    /// JSON value for this timestamp: a number for the Unix layouts, a string otherwise
    #[must_use]
    pub fn to_json_value(&self, datetime: &DateTime<Utc>, zone: TimeZone) -> serde_json::Value {
        match self {
            TimestampFormat::Unix => serde_json::Value::Number(datetime.timestamp().into()),
            TimestampFormat::UnixMillis => {
                serde_json::Value::Number(datetime.timestamp_millis().into())
            }
            TimestampFormat::UnixMicros => {
                serde_json::Value::Number(datetime.timestamp_micros().into())
            }
            _ => serde_json::Value::String(self.format(datetime, zone)),
        }
    }

    /// Check if this is a Unix-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimestampFormat::Unix | TimestampFormat::UnixMillis | TimestampFormat::UnixMicros
        )
    }
}

/// Invalid strftime specifiers make chrono's `Display` fail; fall back to the raw layout
fn render_strftime(formatted: impl std::fmt::Display, layout: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    match write!(out, "{}", formatted) {
        Ok(()) => out,
        Err(_) => layout.to_string(),
    }
}
