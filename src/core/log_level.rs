//! Log level definitions

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
    /// Disables output when used as a threshold; never attached to a record
    Off = 6,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Off,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Off => "OFF",
        }
    }

    /// Lowercase full name, as rendered by the `%l` pattern flag
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Off => "off",
        }
    }

    /// One-letter name, as rendered by the `%L` pattern flag
    pub fn short_name(&self) -> &'static str {
        match self {
            LogLevel::Trace => "T",
            LogLevel::Debug => "D",
            LogLevel::Info => "I",
            LogLevel::Warn => "W",
            LogLevel::Error => "E",
            LogLevel::Critical => "C",
            LogLevel::Off => "O",
        }
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => BrightBlack,
            LogLevel::Debug => Cyan,
            LogLevel::Info => Green,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::Critical => BrightRed,
            LogLevel::Off => White,
        }
    }

    pub fn from_u8(value: u8) -> LogLevel {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            5 => LogLevel::Critical,
            _ => LogLevel::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "err" => Ok(LogLevel::Error),
            "critical" | "crit" | "fatal" => Ok(LogLevel::Critical),
            "off" => Ok(LogLevel::Off),
            _ => Err(LoggerError::invalid_level(s)),
        }
    }
}

/// Level threshold readable without locking.
///
/// Loads use `Relaxed` ordering: a threshold change only needs to become
/// visible eventually, it never guards other memory.
#[derive(Debug)]
pub struct AtomicLevel(AtomicU8);

impl AtomicLevel {
    pub const fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    #[inline]
    pub fn load(&self) -> LogLevel {
        LogLevel::from_u8(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, level: LogLevel) {
        self.0.store(level as u8, Ordering::Relaxed);
    }

    /// True if a record at `level` passes this threshold
    #[inline]
    pub fn allows(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level as u8 >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(LogLevel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("ERR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("fatal".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert_eq!(" off ".parse::<LogLevel>().unwrap(), LogLevel::Off);
    }

    #[test]
    fn test_parse_unknown_is_config_error() {
        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidLevel { ref name } if name == "verbose"));
    }

    #[test]
    fn test_names() {
        assert_eq!(LogLevel::Info.as_lowercase(), "info");
        assert_eq!(LogLevel::Warn.as_lowercase(), "warning");
        assert_eq!(LogLevel::Info.short_name(), "I");
        assert_eq!(LogLevel::Critical.to_str(), "CRITICAL");
    }

    #[test]
    fn test_atomic_level() {
        let level = AtomicLevel::new(LogLevel::Warn);
        assert!(!level.allows(LogLevel::Info));
        assert!(level.allows(LogLevel::Warn));
        assert!(level.allows(LogLevel::Critical));
        assert!(!level.allows(LogLevel::Off));

        level.store(LogLevel::Off);
        assert!(!level.allows(LogLevel::Critical));
        assert_eq!(level.load(), LogLevel::Off);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        let level: LogLevel = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(level, LogLevel::Critical);
    }
}
