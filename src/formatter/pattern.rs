//! Pattern formatter
//!
//! A pattern is literal text mixed with `%` flags. It is compiled once into a
//! token sequence; unknown flags are rejected at compile time so a bad
//! pattern never reaches the logging path.
//!
//! | flag | output | flag | output |
//! |------|--------|------|--------|
//! | `%v` | message | `%n` | logger name |
//! | `%l` | level (`info`) | `%L` | short level (`I`) |
//! | `%t` | thread id | `%P` | process id |
//! | `%N` | record sequence number | `%*` | structured fields (` k=v ...`) |
//! | `%i` | ms since the previous record | `%u` | µs since the previous record |
//! | `%o` | ns since the previous record | `%O` | s since the previous record |
//! | `%Y` | year `2025` | `%C`, `%y` | year `25` |
//! | `%m` | month `01` | `%d` | day `08` |
//! | `%H` | hour `10` | `%I` | hour, 12h clock |
//! | `%M` | minute | `%S` | second |
//! | `%e` | milliseconds | `%f` | microseconds |
//! | `%F` | nanoseconds | `%p` | `AM` / `PM` |
//! | `%a`, `%A` | weekday `Wed`, `Wednesday` | `%b`, `%B` | month `Jan`, `January` |
//! | `%c` | `Wed Jan 08 10:30:45 2025` | `%D`, `%x` | `01/08/25` |
//! | `%T`, `%X` | `10:30:45` | `%R` | `10:30` |
//! | `%r` | `10:30:45 AM` | `%z` | `+00:00` |
//! | `%E` | seconds since epoch | `%@` | `file:line` |
//! | `%s` | source file name | `%g` | source file path |
//! | `%#` | source line | `%!` | module path |
//! | `%^` | start color range | `%$` | end color range |
//! | `%%` | `%` | `%+` | the default pattern |
//!
//! A flag may carry padding: `%8l` right-aligns in 8 columns, `%-8l`
//! left-aligns, `%=8l` centers, and `%8!l` also truncates longer values.

use super::{FormatBuffer, Formatter};
use crate::core::error::{LoggerError, Result};
use crate::core::log_record::{escape_line_breaks, LogRecord};
use crate::core::timestamp::TimeZone;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike, Utc};
use once_cell::sync::Lazy;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, Ordering};

pub const DEFAULT_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%n] [%^%l%$] %v%*";

const MAX_PADDING: usize = 128;

static PROCESS_ID: Lazy<u32> = Lazy::new(std::process::id);

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const WEEKDAYS_FULL: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTHS_FULL: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Padding {
    width: usize,
    align: Align,
    truncate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Message,
    LoggerName,
    Level,
    ShortLevel,
    ThreadId,
    ProcessId,
    Sequence,
    Fields,
    ElapsedMillis,
    ElapsedMicros,
    ElapsedNanos,
    ElapsedSeconds,
    Year,
    ShortYear,
    Month,
    Day,
    Hour,
    Hour12,
    Minute,
    Second,
    Millis,
    Micros,
    Nanos,
    AmPm,
    Weekday,
    WeekdayFull,
    MonthName,
    MonthNameFull,
    DateTime,
    ShortDate,
    Time,
    HourMinute,
    Time12,
    UtcOffset,
    EpochSeconds,
    SourceFile,
    SourcePath,
    SourceLine,
    ModulePath,
    SourceLocation,
}

impl Flag {
    fn from_char(c: char) -> Option<Flag> {
        let flag = match c {
            'v' => Flag::Message,
            'n' => Flag::LoggerName,
            'l' => Flag::Level,
            'L' => Flag::ShortLevel,
            't' => Flag::ThreadId,
            'P' => Flag::ProcessId,
            'N' => Flag::Sequence,
            'i' => Flag::ElapsedMillis,
            'u' => Flag::ElapsedMicros,
            'o' => Flag::ElapsedNanos,
            'O' => Flag::ElapsedSeconds,
            '*' => Flag::Fields,
            'Y' => Flag::Year,
            'C' | 'y' => Flag::ShortYear,
            'm' => Flag::Month,
            'd' => Flag::Day,
            'H' => Flag::Hour,
            'I' => Flag::Hour12,
            'M' => Flag::Minute,
            'S' => Flag::Second,
            'e' => Flag::Millis,
            'f' => Flag::Micros,
            'F' => Flag::Nanos,
            'p' => Flag::AmPm,
            'a' => Flag::Weekday,
            'A' => Flag::WeekdayFull,
            'b' | 'h' => Flag::MonthName,
            'B' => Flag::MonthNameFull,
            'c' => Flag::DateTime,
            'D' | 'x' => Flag::ShortDate,
            'T' | 'X' => Flag::Time,
            'R' => Flag::HourMinute,
            'r' => Flag::Time12,
            'z' => Flag::UtcOffset,
            'E' => Flag::EpochSeconds,
            's' => Flag::SourceFile,
            'g' => Flag::SourcePath,
            '#' => Flag::SourceLine,
            '!' => Flag::ModulePath,
            '@' => Flag::SourceLocation,
            _ => return None,
        };
        Some(flag)
    }

    fn is_elapsed(&self) -> bool {
        matches!(
            self,
            Flag::ElapsedMillis | Flag::ElapsedMicros | Flag::ElapsedNanos | Flag::ElapsedSeconds
        )
    }

    fn needs_wall_clock(&self) -> bool {
        matches!(
            self,
            Flag::Year
                | Flag::ShortYear
                | Flag::Month
                | Flag::Day
                | Flag::Hour
                | Flag::Hour12
                | Flag::Minute
                | Flag::Second
                | Flag::Millis
                | Flag::Micros
                | Flag::Nanos
                | Flag::AmPm
                | Flag::Weekday
                | Flag::WeekdayFull
                | Flag::MonthName
                | Flag::MonthNameFull
                | Flag::DateTime
                | Flag::ShortDate
                | Flag::Time
                | Flag::HourMinute
                | Flag::Time12
                | Flag::UtcOffset
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Flag(Flag, Option<Padding>),
    ColorStart,
    ColorEnd,
}

const NO_RECORD_YET: i64 = i64::MIN;

/// Timestamp of the previous record seen by the elapsed-time flags
///
/// A clone starts over, so every sink measures its own gaps.
#[derive(Debug)]
struct LastRecordTime(AtomicI64);

impl LastRecordTime {
    fn new() -> Self {
        Self(AtomicI64::new(NO_RECORD_YET))
    }

    /// Nanoseconds since the previous record; zero for the first record or
    /// when timestamps go backwards
    fn advance(&self, timestamp: &DateTime<Utc>) -> u64 {
        let now = timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX);
        let previous = self.0.swap(now, Ordering::AcqRel);
        if previous == NO_RECORD_YET {
            return 0;
        }
        u64::try_from(now.saturating_sub(previous)).unwrap_or(0)
    }
}

impl Clone for LastRecordTime {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Record timestamp broken into wall-clock fields for one zone
struct WallClock {
    time: NaiveDateTime,
    offset_seconds: i32,
}

impl WallClock {
    fn new(timestamp: &DateTime<Utc>, zone: TimeZone) -> Self {
        match zone {
            TimeZone::Utc => Self {
                time: timestamp.naive_utc(),
                offset_seconds: 0,
            },
            TimeZone::Local => {
                let local = timestamp.with_timezone(&Local);
                Self {
                    time: local.naive_local(),
                    offset_seconds: local.offset().local_minus_utc(),
                }
            }
        }
    }

    fn hour12(&self) -> u32 {
        match self.time.hour() % 12 {
            0 => 12,
            h => h,
        }
    }

    fn am_pm(&self) -> &'static str {
        if self.time.hour() >= 12 {
            "PM"
        } else {
            "AM"
        }
    }

    fn nanos(&self) -> u32 {
        // leap seconds report nanoseconds past 1e9
        self.time.nanosecond() % 1_000_000_000
    }
}

/// Formatter driven by a compiled `%` pattern
///
/// # Example
///
/// ```
/// use rust_sink_logger::formatter::{FormatBuffer, Formatter, PatternFormatter};
/// use rust_sink_logger::core::{LogLevel, LogRecord};
///
/// let formatter = PatternFormatter::new("[%n] [%l] %v").unwrap();
/// let record = LogRecord::new("svc", LogLevel::Info, "started");
///
/// let mut buf = FormatBuffer::new();
/// formatter.format(&record, &mut buf);
/// assert_eq!(buf.as_str(), "[svc] [info] started\n");
///
/// assert!(PatternFormatter::new("%Q").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    tokens: Vec<Token>,
    zone: TimeZone,
    eol: String,
    needs_wall_clock: bool,
    needs_elapsed: bool,
    last_record: LastRecordTime,
}

impl PatternFormatter {
    /// Compile `pattern`
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidPattern`] for an unknown flag, a dangling
    /// `%`, or padding that is malformed or wider than 128 columns.
    pub fn new(pattern: &str) -> Result<Self> {
        let tokens = compile(pattern)?;
        let needs_wall_clock = tokens
            .iter()
            .any(|t| matches!(t, Token::Flag(flag, _) if flag.needs_wall_clock()));
        let needs_elapsed = tokens
            .iter()
            .any(|t| matches!(t, Token::Flag(flag, _) if flag.is_elapsed()));

        Ok(Self {
            pattern: pattern.to_string(),
            tokens,
            zone: TimeZone::Utc,
            eol: "\n".to_string(),
            needs_wall_clock,
            needs_elapsed,
            last_record: LastRecordTime::new(),
        })
    }

    /// Render time fields in `zone` instead of UTC
    #[must_use]
    pub fn with_time_zone(mut self, zone: TimeZone) -> Self {
        self.zone = zone;
        self
    }

    /// Replace the line terminator appended to every record
    #[must_use]
    pub fn with_eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = eol.into();
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn time_zone(&self) -> TimeZone {
        self.zone
    }

    /// Format into a fresh string
    pub fn format_to_string(&self, record: &LogRecord) -> String {
        let mut buf = FormatBuffer::with_capacity(128);
        self.format(record, &mut buf);
        buf.into_string()
    }

    fn render_flag(
        flag: Flag,
        record: &LogRecord,
        clock: Option<&WallClock>,
        elapsed_nanos: u64,
        out: &mut String,
    ) {
        match flag {
            Flag::Message => out.push_str(&record.message),
            Flag::LoggerName => out.push_str(&record.logger_name),
            Flag::Level => out.push_str(record.level.as_lowercase()),
            Flag::ShortLevel => out.push_str(record.level.short_name()),
            Flag::ThreadId => {
                let _ = write!(out, "{}", record.thread_id);
            }
            Flag::ProcessId => {
                let _ = write!(out, "{}", *PROCESS_ID);
            }
            Flag::Sequence => {
                let _ = write!(out, "{}", record.sequence);
            }
            Flag::ElapsedMillis => {
                let _ = write!(out, "{}", elapsed_nanos / 1_000_000);
            }
            Flag::ElapsedMicros => {
                let _ = write!(out, "{}", elapsed_nanos / 1_000);
            }
            Flag::ElapsedNanos => {
                let _ = write!(out, "{}", elapsed_nanos);
            }
            Flag::ElapsedSeconds => {
                let _ = write!(out, "{}", elapsed_nanos / 1_000_000_000);
            }
            Flag::Fields => {
                for (key, value) in record.fields.iter() {
                    let value = value.to_string();
                    let _ = write!(
                        out,
                        " {}={}",
                        escape_line_breaks(key),
                        escape_line_breaks(&value)
                    );
                }
            }
            Flag::EpochSeconds => {
                let _ = write!(out, "{}", record.timestamp.timestamp());
            }
            Flag::SourceFile => {
                if let Some(source) = &record.source {
                    out.push_str(source.file_name());
                }
            }
            Flag::SourcePath => {
                if let Some(source) = &record.source {
                    out.push_str(&source.file);
                }
            }
            Flag::SourceLine => {
                if let Some(source) = &record.source {
                    let _ = write!(out, "{}", source.line);
                }
            }
            Flag::ModulePath => {
                if let Some(source) = &record.source {
                    out.push_str(&source.module_path);
                }
            }
            Flag::SourceLocation => {
                if let Some(source) = &record.source {
                    let _ = write!(out, "{}:{}", source.file, source.line);
                }
            }
            _ => {
                if let Some(clock) = clock {
                    Self::render_time(flag, clock, out);
                }
            }
        }
    }

    fn render_time(flag: Flag, clock: &WallClock, out: &mut String) {
        let t = &clock.time;
        let _ = match flag {
            Flag::Year => write!(out, "{:04}", t.year()),
            Flag::ShortYear => write!(out, "{:02}", t.year().rem_euclid(100)),
            Flag::Month => write!(out, "{:02}", t.month()),
            Flag::Day => write!(out, "{:02}", t.day()),
            Flag::Hour => write!(out, "{:02}", t.hour()),
            Flag::Hour12 => write!(out, "{:02}", clock.hour12()),
            Flag::Minute => write!(out, "{:02}", t.minute()),
            Flag::Second => write!(out, "{:02}", t.second()),
            Flag::Millis => write!(out, "{:03}", clock.nanos() / 1_000_000),
            Flag::Micros => write!(out, "{:06}", clock.nanos() / 1_000),
            Flag::Nanos => write!(out, "{:09}", clock.nanos()),
            Flag::AmPm => write!(out, "{}", clock.am_pm()),
            Flag::Weekday => {
                write!(out, "{}", WEEKDAYS[t.weekday().num_days_from_sunday() as usize])
            }
            Flag::WeekdayFull => write!(
                out,
                "{}",
                WEEKDAYS_FULL[t.weekday().num_days_from_sunday() as usize]
            ),
            Flag::MonthName => write!(out, "{}", MONTHS[t.month0() as usize]),
            Flag::MonthNameFull => write!(out, "{}", MONTHS_FULL[t.month0() as usize]),
            Flag::DateTime => write!(
                out,
                "{} {} {:02} {:02}:{:02}:{:02} {:04}",
                WEEKDAYS[t.weekday().num_days_from_sunday() as usize],
                MONTHS[t.month0() as usize],
                t.day(),
                t.hour(),
                t.minute(),
                t.second(),
                t.year()
            ),
            Flag::ShortDate => write!(
                out,
                "{:02}/{:02}/{:02}",
                t.month(),
                t.day(),
                t.year().rem_euclid(100)
            ),
            Flag::Time => write!(out, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()),
            Flag::HourMinute => write!(out, "{:02}:{:02}", t.hour(), t.minute()),
            Flag::Time12 => write!(
                out,
                "{:02}:{:02}:{:02} {}",
                clock.hour12(),
                t.minute(),
                t.second(),
                clock.am_pm()
            ),
            Flag::UtcOffset => {
                let sign = if clock.offset_seconds < 0 { '-' } else { '+' };
                let total = clock.offset_seconds.unsigned_abs() / 60;
                write!(out, "{}{:02}:{:02}", sign, total / 60, total % 60)
            }
            _ => Ok(()),
        };
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN).expect("default pattern compiles")
    }
}

impl Formatter for PatternFormatter {
    fn format(&self, record: &LogRecord, dest: &mut FormatBuffer) {
        let clock = self
            .needs_wall_clock
            .then(|| WallClock::new(&record.timestamp, self.zone));
        let elapsed_nanos = if self.needs_elapsed {
            self.last_record.advance(&record.timestamp)
        } else {
            0
        };

        for token in &self.tokens {
            match token {
                Token::Literal(text) => dest.push_str(text),
                Token::ColorStart => dest.mark_color_start(),
                Token::ColorEnd => dest.mark_color_end(),
                Token::Flag(flag, padding) => {
                    let out = dest.text_mut();
                    let start = out.len();
                    Self::render_flag(*flag, record, clock.as_ref(), elapsed_nanos, out);
                    if let Some(padding) = padding {
                        apply_padding(out, start, *padding);
                    }
                }
            }
        }
        dest.push_str(&self.eol);
    }

    fn box_clone(&self) -> Box<dyn Formatter> {
        Box::new(self.clone())
    }
}

fn apply_padding(out: &mut String, start: usize, padding: Padding) {
    let rendered = out[start..].chars().count();
    if rendered >= padding.width {
        if padding.truncate {
            if let Some((idx, _)) = out[start..].char_indices().nth(padding.width) {
                out.truncate(start + idx);
            }
        }
        return;
    }

    let missing = padding.width - rendered;
    match padding.align {
        Align::Right => out.insert_str(start, &" ".repeat(missing)),
        Align::Left => out.push_str(&" ".repeat(missing)),
        Align::Center => {
            let left = missing / 2;
            out.insert_str(start, &" ".repeat(left));
            out.push_str(&" ".repeat(missing - left));
        }
    }
}

fn compile(pattern: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        let align = match chars.peek() {
            Some((_, '-')) => Some(Align::Left),
            Some((_, '=')) => Some(Align::Center),
            _ => None,
        };
        if align.is_some() {
            chars.next();
        }

        let mut width: Option<usize> = None;
        while let Some(digit) = chars.peek().and_then(|(_, d)| d.to_digit(10)) {
            chars.next();
            let next = width.unwrap_or(0) * 10 + digit as usize;
            if next > MAX_PADDING {
                return Err(LoggerError::invalid_pattern(
                    pattern,
                    pos,
                    format!("padding width exceeds {}", MAX_PADDING),
                ));
            }
            width = Some(next);
        }

        let truncate = width.is_some() && matches!(chars.peek(), Some((_, '!')));
        if truncate {
            chars.next();
        }

        let padding = match (align, width) {
            (_, Some(width)) => Some(Padding {
                width,
                align: align.unwrap_or(Align::Right),
                truncate,
            }),
            (Some(_), None) => {
                return Err(LoggerError::invalid_pattern(
                    pattern,
                    pos,
                    "alignment given without a width",
                ))
            }
            (None, None) => None,
        };

        let (_, flag_char) = chars.next().ok_or_else(|| {
            LoggerError::invalid_pattern(pattern, pos, "dangling '%' at end of pattern")
        })?;

        let plain = |what: &str| -> Result<()> {
            if padding.is_some() {
                Err(LoggerError::invalid_pattern(
                    pattern,
                    pos,
                    format!("{} does not accept padding", what),
                ))
            } else {
                Ok(())
            }
        };

        match flag_char {
            '%' => {
                plain("'%%'")?;
                literal.push('%');
            }
            '+' => {
                plain("'%+'")?;
                flush_literal(&mut literal, &mut tokens);
                tokens.extend(compile(DEFAULT_PATTERN)?);
            }
            '^' => {
                plain("'%^'")?;
                flush_literal(&mut literal, &mut tokens);
                tokens.push(Token::ColorStart);
            }
            '$' => {
                plain("'%$'")?;
                flush_literal(&mut literal, &mut tokens);
                tokens.push(Token::ColorEnd);
            }
            other => {
                let flag = Flag::from_char(other).ok_or_else(|| {
                    LoggerError::invalid_pattern(pattern, pos, format!("unknown flag '%{}'", other))
                })?;
                flush_literal(&mut literal, &mut tokens);
                tokens.push(Token::Flag(flag, padding));
            }
        }
    }

    flush_literal(&mut literal, &mut tokens);
    Ok(tokens)
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}
