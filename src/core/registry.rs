//! Directory of loggers by name, with a default logger and shared resources

use super::async_queue::{AsyncConfig, AsyncQueue, DEFAULT_SHUTDOWN_TIMEOUT};
use super::config::LevelSpec;
use super::error::{LoggerError, Result};
use super::error_handler::ErrorHandler;
use super::log_level::LogLevel;
use super::logger::{FlushStatus, Logger};
use crate::formatter::{Formatter, PatternFormatter};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type LoggerMap = Arc<RwLock<HashMap<String, Arc<Logger>>>>;

struct PeriodicFlusher {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicFlusher {
    fn spawn(loggers: LoggerMap, interval: Duration) -> Result<Self> {
        let (stop, stopped) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("logger-flusher".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let snapshot: Vec<Arc<Logger>> = loggers.read().values().cloned().collect();
                        for logger in snapshot {
                            logger.flush();
                        }
                    }
                    _ => break,
                }
            })
            .map_err(|e| LoggerError::io_operation("spawning periodic flusher", e.to_string(), e))?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        drop(self.stop);
        if self.handle.join().is_err() {
            eprintln!("[LOGGER WARNING] Periodic flusher thread panicked");
        }
    }
}

/// Loggers by name, plus the settings every registered logger shares
///
/// Lookups take a read lock; registration takes the write lock. Bulk
/// operations work on a snapshot, so the callback never runs under the lock.
///
/// # Example
///
/// ```
/// use rust_sink_logger::prelude::*;
///
/// let registry = Registry::new();
/// let net = registry
///     .get_or_create("net", || Logger::builder().name("net").sink(NullSink::new()).build())
///     .unwrap();
/// let again = registry.get_or_create("net", || unreachable!()).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&net, &again));
///
/// registry.set_level_all(LogLevel::Warn);
/// assert_eq!(net.level(), LogLevel::Warn);
/// ```
#[derive(Default)]
pub struct Registry {
    loggers: LoggerMap,
    default_logger: RwLock<Option<Arc<Logger>>>,
    error_handler: RwLock<Option<ErrorHandler>>,
    levels: RwLock<LevelSpec>,
    queue: Mutex<Option<Arc<AsyncQueue>>>,
    flusher: Mutex<Option<PeriodicFlusher>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the logger called `name`, building it with `factory` if absent
    ///
    /// The factory runs under the registry's write lock, so concurrent callers
    /// with the same name run it at most once and all get the same logger. It
    /// must not call back into this registry, and the logger it returns must
    /// carry `name`.
    pub fn get_or_create<F>(&self, name: &str, factory: F) -> Result<Arc<Logger>>
    where
        F: FnOnce() -> Result<Logger>,
    {
        if let Some(logger) = self.loggers.read().get(name) {
            return Ok(Arc::clone(logger));
        }

        let mut loggers = self.loggers.write();
        if let Some(logger) = loggers.get(name) {
            return Ok(Arc::clone(logger));
        }

        let logger = factory()?;
        if logger.name() != name {
            return Err(LoggerError::config(
                "Registry",
                format!(
                    "factory for '{}' built a logger named '{}'",
                    name,
                    logger.name()
                ),
            ));
        }
        let logger = Arc::new(logger);
        self.prepare(&logger);
        loggers.insert(name.to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    /// Add `logger` under its name; fails if the name is taken
    pub fn register(&self, logger: impl Into<Arc<Logger>>) -> Result<()> {
        let logger = logger.into();
        let mut loggers = self.loggers.write();
        if loggers.contains_key(logger.name()) {
            return Err(LoggerError::logger_exists(logger.name()));
        }
        self.prepare(&logger);
        loggers.insert(logger.name().to_string(), logger);
        Ok(())
    }

    /// Apply the registry-wide error handler and level overrides
    fn prepare(&self, logger: &Logger) {
        if let Some(handler) = self.error_handler.read().as_ref() {
            logger.set_error_handler(Arc::clone(handler));
        }
        if let Some(level) = self.levels.read().level_for(logger.name()) {
            logger.set_level(level);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loggers.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.read().is_empty()
    }

    /// Remove `name`; clears the default logger if it was the default
    pub fn drop_logger(&self, name: &str) {
        let removed = self.loggers.write().remove(name);
        if removed.is_none() {
            return;
        }
        let mut default = self.default_logger.write();
        if default.as_ref().is_some_and(|logger| logger.name() == name) {
            *default = None;
        }
    }

    /// Remove every logger, including the default
    pub fn drop_all(&self) {
        self.loggers.write().clear();
        *self.default_logger.write() = None;
    }

    /// Run `f` on every registered logger
    ///
    /// `f` sees the loggers registered when the call started and runs without
    /// the registry lock held, so it may call back into the registry.
    pub fn apply_all<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Logger>),
    {
        let snapshot: Vec<Arc<Logger>> = self.loggers.read().values().cloned().collect();
        for logger in &snapshot {
            f(logger);
        }
    }

    /// Set every logger's level; loggers registered later start at `level`
    ///
    /// Per-name overrides from an earlier [`set_levels`](Self::set_levels)
    /// are discarded.
    pub fn set_level_all(&self, level: LogLevel) {
        *self.levels.write() = LevelSpec::new().with_default(level);
        self.apply_all(|logger| logger.set_level(level));
    }

    /// Install a level spec for current and future loggers
    ///
    /// Loggers the level spec does not name keep their level.
    pub fn set_levels(&self, spec: LevelSpec) {
        *self.levels.write() = spec.clone();
        self.apply_all(|logger| {
            if let Some(level) = spec.level_for(logger.name()) {
                logger.set_level(level);
            }
        });
    }

    pub fn levels(&self) -> LevelSpec {
        self.levels.read().clone()
    }

    /// Compile `pattern` once and give a copy to every sink of every logger
    pub fn set_pattern_all(&self, pattern: &str) -> Result<()> {
        let formatter: Box<dyn Formatter> = Box::new(PatternFormatter::new(pattern)?);
        self.apply_all(|logger| logger.set_formatter(formatter.clone()));
        Ok(())
    }

    /// Flush every logger; returns the status of each by name
    pub fn flush_all(&self) -> Vec<(String, FlushStatus)> {
        let mut statuses = Vec::new();
        self.apply_all(|logger| statuses.push((logger.name().to_string(), logger.flush())));
        statuses
    }

    /// Use `handler` for every current and future logger
    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.error_handler.write() = Some(Arc::clone(&handler));
        self.apply_all(|logger| logger.set_error_handler(Arc::clone(&handler)));
    }

    pub fn default_logger(&self) -> Option<Arc<Logger>> {
        self.default_logger.read().clone()
    }

    /// Replace the default logger; `Some` also registers it under its name
    pub fn set_default_logger(&self, logger: Option<Arc<Logger>>) {
        if let Some(logger) = &logger {
            self.prepare(logger);
            self.loggers
                .write()
                .insert(logger.name().to_string(), Arc::clone(logger));
        }
        *self.default_logger.write() = logger;
    }

    /// Start a new shared queue and make it the one handed out from now on
    ///
    /// Loggers built on the previous queue keep using it until they are dropped.
    pub fn init_async(&self, config: AsyncConfig) -> Result<Arc<AsyncQueue>> {
        let queue = Arc::new(AsyncQueue::spawn(config)?);
        *self.queue.lock() = Some(Arc::clone(&queue));
        Ok(queue)
    }

    /// The shared queue, started with default settings on first use
    pub fn async_queue(&self) -> Result<Arc<AsyncQueue>> {
        let mut queue = self.queue.lock();
        if let Some(queue) = queue.as_ref() {
            return Ok(Arc::clone(queue));
        }
        let created = Arc::new(AsyncQueue::spawn(AsyncConfig::default())?);
        *queue = Some(Arc::clone(&created));
        Ok(created)
    }

    /// Flush every logger every `interval` from a background thread
    ///
    /// Replaces a flusher started earlier.
    pub fn flush_every(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(LoggerError::config(
                "flush_every",
                "interval must be greater than 0",
            ));
        }
        let mut flusher = self.flusher.lock();
        if let Some(previous) = flusher.take() {
            previous.stop();
        }
        *flusher = Some(PeriodicFlusher::spawn(Arc::clone(&self.loggers), interval)?);
        Ok(())
    }

    pub fn stop_flush_every(&self) {
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
    }

    /// Stop the flusher, flush everything, drain the shared queue and drop all loggers
    pub fn shutdown(&self) {
        self.stop_flush_every();
        self.flush_all();
        if let Some(queue) = self.queue.lock().take() {
            queue.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
        self.drop_all();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("loggers", &self.names())
            .field("levels", &self.levels.read().to_string())
            .field("flushing", &self.flusher.lock().is_some())
            .finish()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.stop_flush_every();
    }
}
