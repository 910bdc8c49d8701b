//! File sink implementation

use super::base::{delegate_sink_core, SinkCore};
use crate::core::{LogRecord, LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How a [`FileSink`] opens and flushes its file
#[derive(Debug, Clone, Default)]
pub struct FileSinkOptions {
    /// Truncate an existing file instead of appending to it
    pub truncate: bool,
    /// Call `sync_data` after every flush
    pub sync_on_flush: bool,
    /// Take an exclusive advisory lock on the file (feature `file-lock`)
    pub exclusive_lock: bool,
}

impl FileSinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    #[must_use]
    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.sync_on_flush = sync;
        self
    }

    #[must_use]
    pub fn exclusive_lock(mut self, lock: bool) -> Self {
        self.exclusive_lock = lock;
        self
    }
}

/// Appends formatted records to a single file
///
/// # Example
///
/// ```no_run
/// use rust_sink_logger::sinks::{FileSink, FileSinkOptions};
///
/// let sink = FileSink::with_options(
///     "/var/log/app.log",
///     FileSinkOptions::new().truncate(true).sync_on_flush(true),
/// )
/// .unwrap();
/// ```
pub struct FileSink {
    core: SinkCore,
    path: PathBuf,
    sync_on_flush: bool,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, FileSinkOptions::default())
    }

    pub fn with_options(path: impl AsRef<Path>, options: FileSinkOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_log_file(&path, options.truncate)?;

        if options.exclusive_lock {
            lock_exclusive(&file, &path)?;
        }

        Ok(Self {
            core: SinkCore::new("file"),
            path,
            sync_on_flush: options.sync_on_flush,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Open `path` for appending (or truncating), creating parent directories
pub(crate) fn open_log_file(path: &Path, truncate: bool) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }

    options.open(path).map_err(|e| {
        LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
    })
}

#[cfg(feature = "file-lock")]
fn lock_exclusive(file: &File, path: &Path) -> Result<()> {
    use fs2::FileExt;

    file.try_lock_exclusive()
        .map_err(|_| LoggerError::file_lock(path.display().to_string()))
}

#[cfg(not(feature = "file-lock"))]
fn lock_exclusive(_file: &File, path: &Path) -> Result<()> {
    Err(LoggerError::config(
        "FileSink",
        format!(
            "exclusive lock requested for '{}' but the `file-lock` feature is disabled",
            path.display()
        ),
    ))
}

impl Sink for FileSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let buf = self.core.render(record);
        self.writer.lock().write_all(buf.as_bytes()).map_err(|e| {
            LoggerError::file_sink(
                self.path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.flush()?;
        if self.sync_on_flush {
            writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    delegate_sink_core!();
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.writer.get_mut().flush();
    }
}
