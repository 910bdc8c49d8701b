//! Level specs and JSON configuration for a [`Registry`](super::registry::Registry)

use super::async_queue::{AsyncConfig, DEFAULT_QUEUE_CAPACITY};
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::overflow_policy::OverflowPolicy;
use super::registry::Registry;
use crate::formatter::PatternFormatter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable read by [`LevelSpec::from_env`]
pub const LEVEL_ENV_VAR: &str = "RUST_SINK_LOGGER_LEVEL";

/// A default level plus per-logger overrides, e.g. `"info,net=debug"`
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LevelSpec, LogLevel};
///
/// let spec: LevelSpec = "warn, net=debug, db=off".parse().unwrap();
/// assert_eq!(spec.level_for("net"), Some(LogLevel::Debug));
/// assert_eq!(spec.level_for("http"), Some(LogLevel::Warn));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSpec {
    default: Option<LogLevel>,
    overrides: BTreeMap<String, LogLevel>,
}

impl LevelSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_default(mut self, level: LogLevel) -> Self {
        self.default = Some(level);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, name: impl Into<String>, level: LogLevel) -> Self {
        self.overrides.insert(name.into(), level);
        self
    }

    pub fn default_level(&self) -> Option<LogLevel> {
        self.default
    }

    /// Level for the logger called `name`: its override, else the default
    pub fn level_for(&self, name: &str) -> Option<LogLevel> {
        self.overrides.get(name).copied().or(self.default)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, LogLevel)> {
        self.overrides.iter().map(|(name, level)| (name.as_str(), *level))
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.overrides.is_empty()
    }

    /// Parse [`LEVEL_ENV_VAR`]; `Ok(None)` when it is unset or blank
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_env_var(LEVEL_ENV_VAR)
    }

    pub fn from_env_var(var: &str) -> Result<Option<Self>> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }
}

impl FromStr for LevelSpec {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut spec = LevelSpec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((name, level)) => {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(LoggerError::config(
                            "LevelSpec",
                            format!("missing logger name in '{}'", part),
                        ));
                    }
                    spec.overrides.insert(name.to_string(), level.parse()?);
                }
                None => spec.default = Some(part.parse()?),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for LevelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(level) = self.default {
            parts.push(level.as_lowercase().to_string());
        }
        for (name, level) in &self.overrides {
            parts.push(format!("{}={}", name, level.as_lowercase()));
        }
        f.write_str(&parts.join(","))
    }
}

/// Shared async queue settings in a [`LoggingConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AsyncQueueSettings {
    pub capacity: usize,
    pub workers: usize,
    /// `block`, `drop_newest`, `drop_oldest` or `block_timeout:<ms>`
    pub overflow: String,
}

impl Default for AsyncQueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            workers: 1,
            overflow: OverflowPolicy::Block.to_string(),
        }
    }
}

impl AsyncQueueSettings {
    pub fn to_async_config(&self) -> Result<AsyncConfig> {
        let config = AsyncConfig::new(self.capacity)
            .workers(self.workers)
            .policy(self.overflow.parse()?);
        config.validate()?;
        Ok(config)
    }
}

/// Registry-wide settings, usually read from JSON
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LoggingConfig, Registry};
///
/// let config = LoggingConfig::from_json(r#"{
///     "level": "info",
///     "pattern": "[%l] %n: %v",
///     "loggers": { "net": "debug" },
///     "async_queue": { "capacity": 4096, "overflow": "drop_oldest" }
/// }"#).unwrap();
///
/// let registry = Registry::new();
/// config.apply(&registry).unwrap();
/// assert_eq!(registry.async_queue().unwrap().capacity(), 4096);
/// registry.shutdown();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub pattern: Option<String>,
    pub flush_level: Option<String>,
    /// Logger name to level name
    pub loggers: BTreeMap<String, String>,
    pub async_queue: Option<AsyncQueueSettings>,
    pub flush_interval_ms: Option<u64>,
}

impl LoggingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logging config",
                format!("{}", path.display()),
                e,
            )
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Level spec built from `level` and `loggers`
    pub fn level_spec(&self) -> Result<LevelSpec> {
        let mut spec = LevelSpec::new();
        if let Some(level) = &self.level {
            spec = spec.with_default(level.parse()?);
        }
        for (name, level) in &self.loggers {
            spec = spec.with_logger(name.clone(), level.parse()?);
        }
        Ok(spec)
    }

    /// Check every value without touching any logger
    pub fn validate(&self) -> Result<()> {
        self.level_spec()?;
        if let Some(level) = &self.flush_level {
            level.parse::<LogLevel>()?;
        }
        if let Some(pattern) = &self.pattern {
            PatternFormatter::new(pattern)?;
        }
        if let Some(queue) = &self.async_queue {
            queue.to_async_config()?;
        }
        if self.flush_interval_ms == Some(0) {
            return Err(LoggerError::config(
                "flush_interval_ms",
                "interval must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Validate, then apply to `registry` and its current loggers
    ///
    /// Nothing is changed when validation fails.
    pub fn apply(&self, registry: &Registry) -> Result<()> {
        self.validate()?;

        let spec = self.level_spec()?;
        if !spec.is_empty() {
            registry.set_levels(spec);
        }
        if let Some(pattern) = &self.pattern {
            registry.set_pattern_all(pattern)?;
        }
        if let Some(level) = &self.flush_level {
            let level: LogLevel = level.parse()?;
            registry.apply_all(|logger| logger.flush_on(level));
        }
        if let Some(queue) = &self.async_queue {
            registry.init_async(queue.to_async_config()?)?;
        }
        if let Some(ms) = self.flush_interval_ms {
            registry.flush_every(Duration::from_millis(ms))?;
        }
        Ok(())
    }
}
