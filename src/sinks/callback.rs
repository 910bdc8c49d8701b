//! Sink that hands each record to a closure

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogRecord, Result, Sink};

type Callback = Box<dyn Fn(&LogRecord, &str) + Send + Sync>;

/// Calls a user closure with the record and its formatted line
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LogLevel, LogRecord, Sink};
/// use rust_sink_logger::sinks::CallbackSink;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let errors = Arc::new(AtomicUsize::new(0));
/// let counter = errors.clone();
/// let sink = CallbackSink::new(move |record, _line| {
///     if record.level >= LogLevel::Error {
///         counter.fetch_add(1, Ordering::Relaxed);
///     }
/// });
///
/// sink.log(&LogRecord::new("svc", LogLevel::Error, "boom")).unwrap();
/// assert_eq!(errors.load(Ordering::Relaxed), 1);
/// ```
pub struct CallbackSink {
    core: SinkCore,
    callback: Callback,
}

impl CallbackSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&LogRecord, &str) + Send + Sync + 'static,
    {
        Self {
            core: SinkCore::new("callback"),
            callback: Box::new(callback),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }
}

impl Sink for CallbackSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let buf = self.core.render(record);
        (self.callback)(record, buf.as_str());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    delegate_sink_core!();
}
