//! Sink that fans records out to a changeable list of child sinks

use super::base::SinkCore;
use crate::core::{LogLevel, LogRecord, Result, Sink};
use crate::formatter::Formatter;
use parking_lot::RwLock;
use std::sync::Arc;

/// Forwards every record and flush to its children
///
/// Children can be added and removed while the sink is attached to a
/// logger. Each child still applies its own level; the distributing sink's
/// level is checked first by the logger. A child that fails does not stop
/// the others, and the first failure is returned.
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LogLevel, LogRecord, Sink};
/// use rust_sink_logger::sinks::{DistSink, RingBufferSink};
/// use std::sync::Arc;
///
/// let ring = Arc::new(RingBufferSink::new(8));
/// let dist = DistSink::new();
/// dist.add_sink(ring.clone());
///
/// dist.log(&LogRecord::new("svc", LogLevel::Info, "fan out")).unwrap();
/// assert_eq!(ring.len(), 1);
/// ```
pub struct DistSink {
    core: SinkCore,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
}

impl DistSink {
    pub fn new() -> Self {
        Self {
            core: SinkCore::new("dist"),
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub fn with_sinks<I>(sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Sink>>,
    {
        let dist = Self::new();
        dist.set_sinks(sinks);
        dist
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    /// Attach `sink` unless this exact sink is already attached
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        let mut sinks = self.sinks.write();
        if !sinks.iter().any(|existing| Arc::ptr_eq(existing, &sink)) {
            sinks.push(sink);
        }
    }

    /// Detach `sink`; returns whether it was attached
    pub fn remove_sink(&self, sink: &Arc<dyn Sink>) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|existing| !Arc::ptr_eq(existing, sink));
        sinks.len() != before
    }

    /// Replace all children at once
    pub fn set_sinks<I>(&self, sinks: I)
    where
        I: IntoIterator<Item = Arc<dyn Sink>>,
    {
        let mut children: Vec<Arc<dyn Sink>> = Vec::new();
        for sink in sinks {
            if !children.iter().any(|existing| Arc::ptr_eq(existing, &sink)) {
                children.push(sink);
            }
        }
        *self.sinks.write() = children;
    }

    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().clone()
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    pub(crate) fn set_children_formatter(&self, formatter: &dyn Formatter) {
        for sink in self.sinks.read().iter() {
            sink.set_formatter(formatter.box_clone());
        }
    }
}

impl Default for DistSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for DistSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let mut first_error = None;
        for sink in self.sinks.read().iter() {
            if !sink.should_log(record.level) {
                continue;
            }
            if let Err(e) = sink.log(record) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for sink in self.sinks.read().iter() {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn level(&self) -> LogLevel {
        self.core.level()
    }

    fn set_level(&self, level: LogLevel) {
        self.core.set_level(level)
    }

    /// Children get their own copy of `formatter`
    fn set_formatter(&self, formatter: Box<dyn Formatter>) {
        self.set_children_formatter(formatter.as_ref());
        self.core.set_formatter(formatter);
    }
}
