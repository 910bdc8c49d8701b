//! Process-wide registry and free functions over it
//!
//! The global registry is created on first use with a console logger named
//! `""` as its default. A level spec in `RUST_SINK_LOGGER_LEVEL` is applied
//! at that point.

use super::config::LevelSpec;
use super::error::Result;
use super::log_level::LogLevel;
use super::logger::Logger;
use super::registry::Registry;
use crate::sinks::ConsoleSink;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    match LevelSpec::from_env() {
        Ok(Some(spec)) => registry.set_levels(spec),
        Ok(None) => {}
        Err(e) => eprintln!("[LOGGER WARNING] Ignoring invalid level spec in environment: {}", e),
    }

    let console = Logger::new("");
    console.add_sink(Arc::new(ConsoleSink::new()));
    registry.set_default_logger(Some(Arc::new(console)));
    registry
});

/// The global registry
pub fn registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// The global default logger, if one is set
///
/// # Example
///
/// ```
/// if let Some(logger) = rust_sink_logger::default_logger() {
///     logger.info("hello from the default logger");
/// }
/// ```
pub fn default_logger() -> Option<Arc<Logger>> {
    registry().default_logger()
}

pub fn set_default_logger(logger: Option<Arc<Logger>>) {
    registry().set_default_logger(logger)
}

pub fn get(name: &str) -> Option<Arc<Logger>> {
    registry().get(name)
}

pub fn get_or_create<F>(name: &str, factory: F) -> Result<Arc<Logger>>
where
    F: FnOnce() -> Result<Logger>,
{
    registry().get_or_create(name, factory)
}

pub fn register(logger: impl Into<Arc<Logger>>) -> Result<()> {
    registry().register(logger)
}

pub fn drop_logger(name: &str) {
    registry().drop_logger(name)
}

pub fn drop_all() {
    registry().drop_all()
}

/// Set the level of every global logger
pub fn set_level(level: LogLevel) {
    registry().set_level_all(level)
}

pub fn flush_every(interval: Duration) -> Result<()> {
    registry().flush_every(interval)
}

/// Flush and drain everything, then drop all global loggers
pub fn shutdown() {
    registry().shutdown()
}
