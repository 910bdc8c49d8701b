//! Structured logging context for key-value fields
//!
//! This module provides:
//! - `LogContext`: Per-record structured fields, kept in insertion order
//! - `LoggerContext`: Persistent fields merged into every record of a logger
//! - `ContextGuard`: RAII guard for scoped context

use parking_lot::RwLock;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u64> for FieldValue {
    /// Values above `i64::MAX` are stored as text
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(FieldValue::Int)
            .unwrap_or_else(|_| FieldValue::String(i.to_string()))
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::from(i as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Structured key-value fields attached to one record.
///
/// Fields keep the order they were added in; setting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContext {
    fields: Vec<(String, FieldValue)>,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field to the context
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.add_field(key, value);
        self
    }

    /// Add a field to the context (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    /// Iterate over fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check if context has any fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Copy every field of `other` whose key is not already present
    pub fn merge_missing(&mut self, other: &LogContext) {
        for (key, value) in other.iter() {
            if !self.contains_key(key) {
                self.fields.push((key.to_string(), value.clone()));
            }
        }
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

impl Serialize for LogContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LogContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ContextVisitor;

        impl<'de> Visitor<'de> for ContextVisitor {
            type Value = LogContext;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LogContext, A::Error> {
                let mut context = LogContext::new();
                while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
                    context.add_field(key, value);
                }
                Ok(context)
            }
        }

        deserializer.deserialize_map(ContextVisitor)
    }
}

/// Logger-level persistent context for structured logging
///
/// `LoggerContext` stores fields that persist across all records of a logger,
/// such as service name, version or environment.
///
/// Thread-safe: Can be safely shared across threads.
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// ctx.set("service", "api-gateway");
/// ctx.set("version", "1.2.3");
///
/// assert_eq!(ctx.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerContext {
    fields: Arc<RwLock<LogContext>>,
}

impl LoggerContext {
    /// Create a new empty logger context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field in the context
    ///
    /// If the field already exists, it will be overwritten.
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.write().add_field(key, value);
    }

    /// Remove a field from the context
    pub fn remove(&self, key: &str) {
        self.fields.write().remove(key);
    }

    /// Clear all fields from the context
    pub fn clear(&self) {
        *self.fields.write() = LogContext::new();
    }

    /// Get a copy of all fields
    pub fn snapshot(&self) -> LogContext {
        self.fields.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Merge context fields into a record's fields
    ///
    /// Record-level fields take priority over logger-level fields.
    pub fn merge_into(&self, log_context: &mut LogContext) {
        log_context.merge_missing(&self.fields.read());
    }

    /// Set `key` until the returned guard is dropped
    pub fn scoped<K, V>(&self, key: K, value: V) -> ContextGuard
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        self.set(key.clone(), value);
        ContextGuard {
            context: Arc::clone(&self.fields),
            key,
        }
    }
}

/// RAII guard for scoped context fields
///
/// When dropped, automatically removes the field from the logger context.
///
/// # Example
///
/// ```
/// use rust_sink_logger::Logger;
///
/// let logger = Logger::builder().name("svc").build().unwrap();
/// {
///     let _guard = logger.scoped_field("request_id", "abc-123");
///     logger.info("Processing request"); // carries request_id
/// }
/// assert!(logger.context().is_empty());
/// ```
pub struct ContextGuard {
    context: Arc<RwLock<LogContext>>,
    key: String,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.context.write().remove(&self.key);
    }
}
