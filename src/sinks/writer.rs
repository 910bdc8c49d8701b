//! Sink over any `Write` implementation, plus an in-memory buffer

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogRecord, Result, Sink};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Writes formatted records to a `W: Write`
pub struct WriterSink<W: Write + Send> {
    core: SinkCore,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            core: SinkCore::new("writer"),
            writer: Mutex::new(writer),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let buf = self.core.render(record);
        self.writer.lock().write_all(buf.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    delegate_sink_core!();
}

/// Cloneable in-memory writer; every clone sees the same bytes
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{LogLevel, LogRecord, Sink};
/// use rust_sink_logger::sinks::{SharedBuffer, WriterSink};
///
/// let buffer = SharedBuffer::new();
/// let sink = WriterSink::new(buffer.clone());
/// sink.log(&LogRecord::new("svc", LogLevel::Info, "captured")).unwrap();
///
/// assert!(buffer.contents().contains("captured"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
