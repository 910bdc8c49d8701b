//! Rotating file sink with automatic log rotation
//!
//! The sink rotates on size, on a fixed interval, at a daily wall-clock time,
//! at the top of every hour, or on size-or-interval. Backups use numbered
//! names with the index placed before the extension:
//!
//! ```text
//! app.log      <- current file (index 0)
//! app.1.log    <- newest backup
//! app.2.log
//! app.3.log.gz <- with compression enabled
//! ```

use super::base::{delegate_sink_core, SinkCore};
use super::file::open_log_file;
use crate::core::{LogRecord, LoggerError, Result, Sink};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone, Timelike};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const MAX_DELETION_FAILURES: usize = 5;

/// Rotation strategy defining when to rotate log files
///
/// # Examples
///
/// ```
/// use rust_sink_logger::sinks::RotationStrategy;
/// use std::time::Duration;
///
/// // Rotate when file exceeds 100 MB
/// let size_strategy = RotationStrategy::Size { max_bytes: 100 * 1024 * 1024 };
///
/// // Rotate every 6 hours
/// let interval = RotationStrategy::Interval { duration: Duration::from_secs(6 * 3600) };
///
/// // Rotate daily at 02:30 local time
/// let daily_strategy = RotationStrategy::daily(2, 30).unwrap();
///
/// // Rotate on size OR time, whichever comes first
/// let hybrid_strategy = RotationStrategy::Hybrid {
///     max_bytes: 50 * 1024 * 1024,
///     interval: Duration::from_secs(24 * 3600),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationStrategy {
    /// Rotate before a write that would push the file past `max_bytes`
    Size { max_bytes: u64 },

    /// Rotate once `duration` has elapsed since the last rotation
    Interval { duration: Duration },

    /// Rotate at `hour:minute` local time every day
    Daily { hour: u8, minute: u8 },

    /// Rotate at the top of every local hour
    Hourly,

    /// Rotate on size OR interval, whichever comes first
    Hybrid { max_bytes: u64, interval: Duration },

    /// No rotation (useful for testing or when external rotation is used)
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::Size {
            max_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl RotationStrategy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationStrategy::Size { max_bytes }
    }

    #[must_use]
    pub fn interval(duration: Duration) -> Self {
        RotationStrategy::Interval { duration }
    }

    /// Create a daily rotation strategy
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `hour > 23` or `minute > 59`
    pub fn daily(hour: u8, minute: u8) -> Result<Self> {
        let strategy = RotationStrategy::Daily { hour, minute };
        strategy.validate()?;
        Ok(strategy)
    }

    #[must_use]
    pub fn hourly() -> Self {
        RotationStrategy::Hourly
    }

    #[must_use]
    pub fn hybrid(max_bytes: u64, interval: Duration) -> Self {
        RotationStrategy::Hybrid { max_bytes, interval }
    }

    #[must_use]
    pub fn never() -> Self {
        RotationStrategy::Never
    }

    /// Check the strategy's parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            RotationStrategy::Daily { hour, minute } if *hour > 23 || *minute > 59 => {
                Err(LoggerError::config(
                    "RotationStrategy",
                    format!("invalid daily rotation time {:02}:{:02}", hour, minute),
                ))
            }
            RotationStrategy::Size { max_bytes: 0 } | RotationStrategy::Hybrid { max_bytes: 0, .. } => {
                Err(LoggerError::config(
                    "RotationStrategy",
                    "max_bytes must be greater than zero",
                ))
            }
            RotationStrategy::Interval { duration } | RotationStrategy::Hybrid { interval: duration, .. }
                if duration.is_zero() =>
            {
                Err(LoggerError::config(
                    "RotationStrategy",
                    "rotation interval must be greater than zero",
                ))
            }
            _ => Ok(()),
        }
    }

    fn max_bytes(&self) -> Option<u64> {
        match self {
            RotationStrategy::Size { max_bytes } | RotationStrategy::Hybrid { max_bytes, .. } => {
                Some(*max_bytes)
            }
            _ => None,
        }
    }

    /// Next time-based rotation after a rotation at `last`, evaluated at `now`
    fn next_rotation(&self, last: SystemTime, now: DateTime<Local>) -> Option<SystemTime> {
        match self {
            RotationStrategy::Interval { duration }
            | RotationStrategy::Hybrid {
                interval: duration, ..
            } => Some(last + *duration),
            RotationStrategy::Daily { hour, minute } => {
                Some(next_daily_boundary(now, u32::from(*hour), u32::from(*minute)).into())
            }
            RotationStrategy::Hourly => Some(next_hour_boundary(now).into()),
            RotationStrategy::Size { .. } | RotationStrategy::Never => None,
        }
    }
}

fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    // DST gaps have no local time; skip ahead an hour
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + ChronoDuration::hours(1))).earliest())
}

/// First `hour:minute` strictly after `now`
pub(crate) fn next_daily_boundary(now: DateTime<Local>, hour: u32, minute: u32) -> DateTime<Local> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .and_then(resolve_local);

    match today {
        Some(at) if at > now => at,
        _ => (now.date_naive() + ChronoDuration::days(1))
            .and_hms_opt(hour, minute, 0)
            .and_then(resolve_local)
            .unwrap_or_else(|| now + ChronoDuration::days(1)),
    }
}

/// Start of the next local hour
pub(crate) fn next_hour_boundary(now: DateTime<Local>) -> DateTime<Local> {
    now.naive_local()
        .date()
        .and_hms_opt(now.hour(), 0, 0)
        .map(|top| top + ChronoDuration::hours(1))
        .and_then(resolve_local)
        .unwrap_or_else(|| now + ChronoDuration::hours(1))
}

/// Name of backup `index` for `base`; index 0 is the base file itself
///
/// The index goes before the extension: `app.log` becomes `app.1.log`.
/// A file without an extension, or a hidden file such as `.app`, gets the
/// index appended.
///
/// ```
/// use rust_sink_logger::sinks::calc_filename;
/// use std::path::PathBuf;
///
/// assert_eq!(calc_filename("rotated.txt", 3), PathBuf::from("rotated.3.txt"));
/// assert_eq!(calc_filename("rotated", 3), PathBuf::from("rotated.3"));
/// assert_eq!(calc_filename("rotated.txt", 0), PathBuf::from("rotated.txt"));
/// ```
pub fn calc_filename(base: impl AsRef<Path>, index: usize) -> PathBuf {
    let base = base.as_ref();
    if index == 0 {
        return base.to_path_buf();
    }

    let file_name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, extension) = split_extension(&file_name);
    base.with_file_name(format!("{}.{}{}", stem, index, extension))
}

fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        // hidden file without extension, or a trailing dot
        None | Some(0) => (file_name, ""),
        Some(pos) if pos + 1 == file_name.len() => (file_name, ""),
        Some(pos) => file_name.split_at(pos),
    }
}

fn compressed_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

/// Configuration for a rotating file sink
///
/// # Examples
///
/// ```
/// use rust_sink_logger::sinks::{RotationPolicy, RotationStrategy};
///
/// // Size-based rotation with compression
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::Size { max_bytes: 50 * 1024 * 1024 })
///     .with_max_files(7)
///     .with_compression(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub strategy: RotationStrategy,
    /// Backups to keep; 0 truncates the current file on rotation
    pub max_files: usize,
    /// Gzip each backup as it is created
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            max_files: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Shorthand for `with_strategy(RotationStrategy::Size { max_bytes: size })`
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.strategy = RotationStrategy::Size { max_bytes: size };
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Size limit, if the strategy rotates on size
    #[must_use]
    pub fn max_file_size(&self) -> Option<u64> {
        self.strategy.max_bytes()
    }
}

struct RotationState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    last_rotation: SystemTime,
    next_rotation: Option<SystemTime>,
    /// Consecutive failures to delete the oldest backup
    deletion_failure_count: usize,
}

/// File sink that rotates its file according to a [`RotationPolicy`]
///
/// # Examples
///
/// ```no_run
/// use rust_sink_logger::sinks::{RotatingFileSink, RotationPolicy, RotationStrategy};
///
/// // Size-based rotation (default policy: 10 MB, 5 backups)
/// let sink = RotatingFileSink::new("/var/log/app.log").unwrap();
///
/// // Daily rotation at midnight with compressed backups
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::daily(0, 0).unwrap())
///     .with_max_files(7)
///     .with_compression(true);
/// let sink = RotatingFileSink::with_policy("/var/log/app.log", policy).unwrap();
/// ```
pub struct RotatingFileSink {
    core: SinkCore,
    base_path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<RotationState>,
}

impl RotatingFileSink {
    /// Create a sink with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Create a sink with a custom policy
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid strategy, or an I/O
    /// error if the file cannot be created or opened
    pub fn with_policy(path: impl AsRef<Path>, policy: RotationPolicy) -> Result<Self> {
        policy.strategy.validate()?;

        let base_path = path.as_ref().to_path_buf();
        let (file, current_size, last_rotation) = Self::open_current(&base_path)?;
        let next_rotation = policy.strategy.next_rotation(last_rotation, Local::now());

        Ok(Self {
            core: SinkCore::new("rotating_file"),
            base_path,
            policy,
            state: Mutex::new(RotationState {
                writer: Some(BufWriter::new(file)),
                current_size,
                last_rotation,
                next_rotation,
                deletion_failure_count: 0,
            }),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.set_name(name);
        self
    }

    /// Open the base file for appending; the modification time stands in for
    /// the last rotation
    fn open_current(path: &Path) -> Result<(File, u64, SystemTime)> {
        let file = open_log_file(path, false)?;
        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_sink(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;
        let last_rotation = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        Ok((file, metadata.len(), last_rotation))
    }

    fn should_rotate(&self, state: &RotationState, incoming: u64) -> bool {
        let size_exceeded = self
            .policy
            .strategy
            .max_bytes()
            .is_some_and(|max| state.current_size > 0 && state.current_size + incoming > max);
        let time_reached = state
            .next_rotation
            .is_some_and(|next| SystemTime::now() >= next);
        size_exceeded || time_reached
    }

    /// Perform log rotation
    fn rotate(&self, state: &mut RotationState) -> Result<()> {
        // Close the current file before renaming it
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.policy.max_files == 0 {
            let file = open_log_file(&self.base_path, true)?;
            self.finish_rotation(state, file);
            return Ok(());
        }

        self.remove_oldest_backup(state)?;

        for i in (1..self.policy.max_files).rev() {
            let old_path = calc_filename(&self.base_path, i);
            let new_path = calc_filename(&self.base_path, i + 1);
            let old_compressed = compressed_path(&old_path);

            if old_compressed.exists() {
                rename_replacing(&old_compressed, &compressed_path(&new_path))?;
            } else if old_path.exists() {
                rename_replacing(&old_path, &new_path)?;
            }
        }

        let backup_path = calc_filename(&self.base_path, 1);
        if self.base_path.exists() {
            rename_replacing(&self.base_path, &backup_path)?;

            if self.policy.compress {
                compress_file(&backup_path)?;
            }
        }

        let file = open_log_file(&self.base_path, false).map_err(|e| {
            LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;
        self.finish_rotation(state, file);
        Ok(())
    }

    fn finish_rotation(&self, state: &mut RotationState, file: File) {
        let now = SystemTime::now();
        state.writer = Some(BufWriter::new(file));
        state.current_size = 0;
        state.last_rotation = now;
        state.next_rotation = self.policy.strategy.next_rotation(now, Local::now());
    }

    fn remove_oldest_backup(&self, state: &mut RotationState) -> Result<()> {
        let oldest = calc_filename(&self.base_path, self.policy.max_files);
        let mut deletion_failed = false;

        for candidate in [compressed_path(&oldest), oldest] {
            if candidate.exists() {
                if let Err(e) = fs::remove_file(&candidate) {
                    deletion_failed = true;
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {} (failure #{}/{})",
                        candidate.display(),
                        e,
                        state.deletion_failure_count + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }

        if !deletion_failed {
            state.deletion_failure_count = 0;
            return Ok(());
        }

        state.deletion_failure_count += 1;
        if state.deletion_failure_count >= MAX_DELETION_FAILURES {
            return Err(LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!(
                    "Rotation aborted: failed to delete old backup files {} consecutive times",
                    state.deletion_failure_count
                ),
            ));
        }
        Ok(())
    }

    /// Reopen the base file after a failed rotation so logging can continue
    fn recover(&self, state: &mut RotationState) -> Result<()> {
        if state.writer.is_none() {
            let (file, _, _) = Self::open_current(&self.base_path)?;
            state.writer = Some(BufWriter::new(file));
        }
        // Let the file grow past its limit rather than retry on every write
        state.current_size = 0;
        state.next_rotation = self
            .policy
            .strategy
            .next_rotation(SystemTime::now(), Local::now());
        Ok(())
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn strategy(&self) -> &RotationStrategy {
        &self.policy.strategy
    }

    #[must_use]
    pub fn last_rotation(&self) -> SystemTime {
        self.state.lock().last_rotation
    }
}

fn rename_replacing(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Some platforms refuse to rename over an existing file
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).map_err(|e| {
        LoggerError::file_rotation(
            from.display().to_string(),
            format!("Failed to rename to {}: {}", to.display(), e),
        )
    })
}

/// Gzip `path` into `path.gz` through a temporary file
///
/// The original is removed only once the compressed file is in place.
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let gz_path = compressed_path(path);
    let mut temp_name = OsString::from(gz_path.as_os_str());
    temp_name.push(".tmp");
    let temp_gz_path = PathBuf::from(temp_name);

    let compress = || -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_gz_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            encoder.write_all(&buffer[..bytes_read])?;
        }
        encoder.finish()?.flush()?;
        fs::rename(&temp_gz_path, &gz_path)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but failed to remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

impl Sink for RotatingFileSink {
    fn log(&self, record: &LogRecord) -> Result<()> {
        let buf = self.core.render(record);
        let incoming = buf.len() as u64;

        let mut state = self.state.lock();
        let mut rotation_error = None;
        if self.should_rotate(&state, incoming) {
            if let Err(e) = self.rotate(&mut state) {
                self.recover(&mut state)?;
                rotation_error = Some(e);
            }
        }

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Writer not initialized"))?;
        writer.write_all(buf.as_bytes()).map_err(|e| {
            LoggerError::file_sink(
                self.base_path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })?;
        state.current_size += incoming;

        // The record is on disk either way; report the failed rotation
        match rotation_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = self.state.lock().writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    delegate_sink_core!();
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.state.get_mut().writer.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use crate::formatter::PatternFormatter;
    use std::io::Read;
    use std::thread;
    use tempfile::tempdir;

    fn sink_with(path: &Path, policy: RotationPolicy) -> RotatingFileSink {
        let sink = RotatingFileSink::with_policy(path, policy).unwrap();
        sink.set_formatter(Box::new(PatternFormatter::new("%v").unwrap()));
        sink
    }

    fn write(sink: &RotatingFileSink, message: &str) {
        sink.log(&LogRecord::new("svc", LogLevel::Info, message))
            .unwrap();
    }

    #[test]
    fn test_calc_filename() {
        assert_eq!(calc_filename("rotated.txt", 3), PathBuf::from("rotated.3.txt"));
        assert_eq!(calc_filename("rotated", 3), PathBuf::from("rotated.3"));
        assert_eq!(calc_filename("rotated.txt", 0), PathBuf::from("rotated.txt"));
        assert_eq!(calc_filename(".app", 1), PathBuf::from(".app.1"));
        assert_eq!(calc_filename("dir.d/app", 2), PathBuf::from("dir.d/app.2"));
        assert_eq!(
            calc_filename("/var/log/app.log", 1),
            PathBuf::from("/var/log/app.1.log")
        );
        assert_eq!(calc_filename("app.tar.gz", 1), PathBuf::from("app.tar.1.gz"));
    }

    #[test]
    fn test_rotation_strategy_constructors() {
        assert_eq!(RotationStrategy::size(1024), RotationStrategy::Size { max_bytes: 1024 });
        assert_eq!(
            RotationStrategy::interval(Duration::from_secs(3600)),
            RotationStrategy::Interval {
                duration: Duration::from_secs(3600)
            }
        );
        assert_eq!(
            RotationStrategy::daily(2, 30).unwrap(),
            RotationStrategy::Daily { hour: 2, minute: 30 }
        );
        assert_eq!(RotationStrategy::hourly(), RotationStrategy::Hourly);
        assert_eq!(RotationStrategy::never(), RotationStrategy::Never);
    }

    #[test]
    fn test_daily_strategy_invalid_time() {
        assert!(RotationStrategy::daily(24, 0).unwrap_err().is_configuration_error());
        assert!(RotationStrategy::daily(23, 60).is_err());
        assert!(RotationStrategy::daily(23, 59).is_ok());
    }

    #[test]
    fn test_invalid_policy_rejected_at_construction() {
        let dir = tempdir().unwrap();
        let policy = RotationPolicy::new().with_strategy(RotationStrategy::Daily { hour: 30, minute: 0 });
        assert!(RotatingFileSink::with_policy(dir.path().join("a.log"), policy).is_err());

        let policy = RotationPolicy::new().with_max_size(0);
        assert!(RotatingFileSink::with_policy(dir.path().join("b.log"), policy).is_err());
    }

    #[test]
    fn test_rotation_policy_builder() {
        let policy = RotationPolicy::new()
            .with_max_size(1024)
            .with_max_files(3)
            .with_compression(true);

        assert_eq!(policy.max_file_size(), Some(1024));
        assert_eq!(policy.max_files, 3);
        assert!(policy.compress);

        let daily = RotationPolicy::new().with_strategy(RotationStrategy::Hourly);
        assert_eq!(daily.max_file_size(), None);
    }

    #[test]
    fn test_size_rotation_shifts_backups() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("rotation.log");
        let sink = sink_with(&log_path, RotationPolicy::new().with_max_size(25).with_max_files(3));

        // each record is 10 bytes with its newline
        for message in ["aaaaaaaaa", "bbbbbbbbb", "ccccccccc", "ddddddddd", "eeeeeeeee"] {
            write(&sink, message);
        }
        sink.flush().unwrap();

        let read = |i| fs::read_to_string(calc_filename(&log_path, i)).unwrap();
        assert_eq!(read(0), "eeeeeeeee\n");
        assert_eq!(read(1), "ccccccccc\nddddddddd\n");
        assert_eq!(read(2), "aaaaaaaaa\nbbbbbbbbb\n");
        assert!(!calc_filename(&log_path, 3).exists());
        assert_eq!(sink.current_size(), 10);
    }

    #[test]
    fn test_oversized_record_written_to_empty_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("big.log");
        let sink = sink_with(&log_path, RotationPolicy::new().with_max_size(5).with_max_files(2));

        write(&sink, "much longer than five bytes");
        sink.flush().unwrap();

        assert!(!calc_filename(&log_path, 1).exists());
        assert_eq!(
            fs::read_to_string(&log_path).unwrap(),
            "much longer than five bytes\n"
        );
    }

    #[test]
    fn test_max_files_limits_backups() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("multi.log");
        let sink = sink_with(&log_path, RotationPolicy::new().with_max_size(50).with_max_files(2));

        for i in 0..100 {
            write(&sink, &format!("Entry {}", i));
        }
        sink.flush().unwrap();

        let log_files = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("multi."))
            .count();
        assert_eq!(log_files, 3); // current + 2 backups
    }

    #[test]
    fn test_failed_rotation_keeps_appending() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("app.log");
        // A directory where the first backup belongs makes the rename fail
        fs::create_dir(calc_filename(&log_path, 1)).unwrap();
        let sink = sink_with(&log_path, RotationPolicy::new().with_max_size(15).with_max_files(1));

        write(&sink, "first one");
        let result = sink.log(&LogRecord::new("svc", LogLevel::Info, "second"));
        assert!(
            matches!(result, Err(LoggerError::FileRotation { .. })),
            "expected a rotation error, got {:?}",
            result
        );

        // The size counter restarts, so the next record does not retry at once
        write(&sink, "third");
        sink.flush().unwrap();

        assert_eq!(
            fs::read_to_string(&log_path).unwrap(),
            "first one\nsecond\nthird\n"
        );
        assert!(calc_filename(&log_path, 1).is_dir());
        assert_eq!(sink.current_size(), 13);
    }

    #[test]
    fn test_zero_max_files_truncates() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("trunc.log");
        let sink = sink_with(&log_path, RotationPolicy::new().with_max_size(15).with_max_files(0));

        write(&sink, "first one");
        write(&sink, "second");
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&log_path).unwrap(), "second\n");
        assert!(!calc_filename(&log_path, 1).exists());
    }

    #[test]
    fn test_compressed_backups() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("zip.log");
        let policy = RotationPolicy::new()
            .with_max_size(20)
            .with_max_files(3)
            .with_compression(true);
        let sink = sink_with(&log_path, policy);

        write(&sink, "first record");
        write(&sink, "second record");
        write(&sink, "third record");
        sink.flush().unwrap();

        let gz1 = dir.path().join("zip.1.log.gz");
        let gz2 = dir.path().join("zip.2.log.gz");
        assert!(gz1.exists());
        assert!(gz2.exists());
        assert!(!dir.path().join("zip.1.log").exists());

        let mut decoder = flate2::read::GzDecoder::new(File::open(&gz2).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, "first record\n");
    }

    #[test]
    fn test_interval_rotation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("time_rotation.log");
        let policy = RotationPolicy::new()
            .with_strategy(RotationStrategy::Interval {
                duration: Duration::from_millis(50),
            })
            .with_max_files(3);
        let sink = sink_with(&log_path, policy);

        write(&sink, "Initial message");
        thread::sleep(Duration::from_millis(80));
        write(&sink, "After interval");
        sink.flush().unwrap();

        assert!(calc_filename(&log_path, 1).exists());
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "After interval\n");
    }

    #[test]
    fn test_no_rotation_with_never_strategy() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("never_rotation.log");
        let sink = sink_with(&log_path, RotationPolicy::new().with_strategy(RotationStrategy::Never));

        for i in 0..100 {
            write(&sink, &format!("Test message number {}", i));
        }
        sink.flush().unwrap();

        assert!(!calc_filename(&log_path, 1).exists());
        assert_eq!(fs::read_to_string(&log_path).unwrap().lines().count(), 100);
    }

    #[test]
    fn test_next_boundaries() {
        let now = Local::now();

        let hour = next_hour_boundary(now);
        assert!(hour > now);
        assert!(hour - now <= ChronoDuration::hours(2));
        assert_eq!(hour.minute(), 0);

        let daily = next_daily_boundary(now, 0, 0);
        assert!(daily > now);
        assert!(daily - now <= ChronoDuration::hours(26));
    }

    #[test]
    fn test_daily_strategy_schedules_future_rotation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("daily.log");
        let policy = RotationPolicy::new().with_strategy(RotationStrategy::daily(3, 15).unwrap());
        let sink = sink_with(&log_path, policy);

        write(&sink, "not rotated yet");
        sink.flush().unwrap();
        assert!(!calc_filename(&log_path, 1).exists());
        assert!(sink.last_rotation() <= SystemTime::now());
    }

    #[test]
    fn test_default_strategy() {
        assert_eq!(
            RotationStrategy::default(),
            RotationStrategy::Size {
                max_bytes: 10 * 1024 * 1024
            }
        );
    }
}
