//! Formatters turn a [`LogRecord`] into the text a sink writes
//!
//! - `PatternFormatter`: `%`-flag pattern compiled once into tokens (default)
//! - `JsonFormatter`: one JSON object per line
//! - `LogfmtFormatter`: `key=value` pairs

pub mod json;
pub mod logfmt;
pub mod pattern;

pub use json::JsonFormatter;
pub use logfmt::LogfmtFormatter;
pub use pattern::{PatternFormatter, DEFAULT_PATTERN};

use crate::core::LogRecord;
use std::ops::Range;

/// Output of one format call: the text plus the byte range to colorize, if any
#[derive(Debug, Clone, Default)]
pub struct FormatBuffer {
    text: String,
    color_start: Option<usize>,
    color_end: Option<usize>,
}

impl FormatBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.color_start = None;
        self.color_end = None;
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub(crate) fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn mark_color_start(&mut self) {
        self.color_start = Some(self.text.len());
    }

    pub fn mark_color_end(&mut self) {
        self.color_end = Some(self.text.len());
    }

    /// Range marked by `%^ ... %$`; an unclosed start runs to the end of the text
    pub fn color_range(&self) -> Option<Range<usize>> {
        let start = self.color_start?;
        let end = self.color_end.filter(|end| *end >= start).unwrap_or(self.text.len());
        Some(start..end)
    }

    /// Text without the trailing end-of-line characters
    pub fn trimmed_line(&self) -> &str {
        self.text.trim_end_matches(['\n', '\r'])
    }
}

/// Renders records
///
/// Output depends only on the record and the configuration, except for state
/// an implementation synchronizes itself, such as the previous record's time.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord, dest: &mut FormatBuffer);

    fn box_clone(&self) -> Box<dyn Formatter>;
}

impl Clone for Box<dyn Formatter> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl std::fmt::Debug for dyn Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Formatter")
    }
}

/// Formatter every sink starts with
pub fn default_formatter() -> Box<dyn Formatter> {
    Box::new(PatternFormatter::default())
}
