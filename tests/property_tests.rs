//! Property-based tests for rust_sink_logger using proptest

use proptest::prelude::*;
use rust_sink_logger::core::LevelSpec;
use rust_sink_logger::prelude::*;
use rust_sink_logger::sinks::calc_filename;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
        Just(LogLevel::Off),
    ]
}

fn record_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Both the uppercase and the lowercase names parse back to the level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let upper: LogLevel = level.to_str().parse().unwrap();
        let lower: LogLevel = level.as_lowercase().parse().unwrap();
        prop_assert_eq!(level, upper);
        prop_assert_eq!(level, lower);
    }

    #[test]
    fn test_log_level_ordering(level1 in any_level(), level2 in any_level()) {
        let val1 = level1 as u8;
        let val2 = level2 as u8;

        prop_assert_eq!(level1 <= level2, val1 <= val2);
        prop_assert_eq!(level1 < level2, val1 < val2);
        prop_assert_eq!(level1.cmp(&level2), val1.cmp(&val2));
        prop_assert_eq!(LogLevel::from_u8(val1), level1);
    }

    #[test]
    fn test_log_level_display(level in any_level()) {
        prop_assert_eq!(format!("{}", level), level.to_str());
    }

    /// Parsing ignores case and surrounding whitespace
    #[test]
    fn test_log_level_case_insensitive(
        level in any_level(),
        use_lower in any::<bool>(),
        pad in " {0,3}",
    ) {
        let name = if use_lower {
            level.to_str().to_lowercase()
        } else {
            level.to_str().to_string()
        };
        let parsed: LogLevel = format!("{}{}{}", pad, name, pad).parse().unwrap();
        prop_assert_eq!(parsed, level);
    }

    #[test]
    fn test_unknown_level_names_rejected(name in "[a-z]{6,12}") {
        prop_assume!(LogLevel::ALL.iter().all(|l| l.as_lowercase() != name));
        prop_assert!(name.parse::<LogLevel>().is_err());
    }
}

#[test]
fn test_log_level_aliases() {
    assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("err".parse::<LogLevel>().unwrap(), LogLevel::Error);
    assert_eq!("crit".parse::<LogLevel>().unwrap(), LogLevel::Critical);
    assert_eq!("FATAL".parse::<LogLevel>().unwrap(), LogLevel::Critical);
}

// ============================================================================
// Message Sanitization Tests (Security Critical!)
// ============================================================================

proptest! {
    /// Line breaks and tabs never survive into a record's message
    #[test]
    fn test_message_sanitization(message in ".*") {
        let record = LogRecord::new("prop", LogLevel::Info, message.clone());

        prop_assert!(!record.message.contains(['\n', '\r', '\t']),
                "Record contains an unsanitized control character: {:?}", record.message);

        if message.contains('\n') {
            prop_assert!(record.message.contains("\\n"));
        }
        if message.contains('\r') {
            prop_assert!(record.message.contains("\\r"));
        }
        if message.contains('\t') {
            prop_assert!(record.message.contains("\\t"));
        }
    }

    /// Messages without control characters pass through untouched
    #[test]
    fn test_clean_messages_unchanged(message in "[a-zA-Z0-9 .,:;!?=-]*") {
        let record = LogRecord::new("prop", LogLevel::Info, message.clone());
        prop_assert_eq!(record.message, message);
    }

    /// An injected level on a new line stays on the original line
    #[test]
    fn test_log_injection_prevention(
        legitimate_msg in "[a-zA-Z0-9 ]+",
        injected_level in prop_oneof![Just("ERROR"), Just("WARN"), Just("CRITICAL")],
    ) {
        let buffer = SharedBuffer::new();
        let logger = Logger::builder()
            .sink(WriterSink::new(buffer.clone()))
            .pattern("[%L] %v")
            .build()
            .unwrap();

        logger.info(format!("{}\n{}: Fake admin login", legitimate_msg, injected_level));

        prop_assert_eq!(buffer.lines().len(), 1,
                   "Message was not properly sanitized: {:?}", buffer.contents());
    }

    /// Field keys and values cannot start a new line in pattern or logfmt output
    #[test]
    fn test_field_injection_prevention(
        key in "[a-z]{1,6}[\n\r\t]?[a-z]{0,4}",
        value in ".*",
        injected_level in prop_oneof![Just("ERROR"), Just("WARN"), Just("CRITICAL")],
    ) {
        let value = format!("{}\n[{}] Fake admin login", value, injected_level);
        let record = LogRecord::new("prop", LogLevel::Info, "request")
            .with_fields(LogContext::new().with_field(key.as_str(), value.as_str()));

        let pattern = PatternFormatter::new("[%L] %v%*").unwrap().format_to_string(&record);
        prop_assert_eq!(pattern.matches(['\n', '\r']).count(), 1, "pattern output: {:?}", pattern);
        prop_assert!(pattern.ends_with('\n'));

        let mut buffer = rust_sink_logger::formatter::FormatBuffer::new();
        LogfmtFormatter::new().format(&record, &mut buffer);
        prop_assert_eq!(buffer.as_str().matches(['\n', '\r']).count(), 1,
                   "logfmt output: {:?}", buffer.as_str());
    }
}

// ============================================================================
// Formatting Tests
// ============================================================================

proptest! {
    /// Rendering the same record twice produces the same bytes
    #[test]
    fn test_pattern_formatting_is_deterministic(
        message in ".*",
        level in record_level(),
        secs in 0i64..4_000_000_000,
        nanos in 0u32..1_000_000_000,
    ) {
        let timestamp = chrono::DateTime::from_timestamp(secs, nanos).unwrap();
        let record = LogRecord::new("prop", level, message).with_timestamp(timestamp);
        let formatter = PatternFormatter::new(rust_sink_logger::formatter::DEFAULT_PATTERN)
            .unwrap()
            .with_time_zone(TimeZone::Utc);

        let first = formatter.format_to_string(&record);
        let second = formatter.format_to_string(&record);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.ends_with('\n'));
        prop_assert_eq!(first.matches('\n').count(), 1);
    }

    /// JSON output always parses and carries the message verbatim
    #[test]
    fn test_json_output_is_valid(message in ".*", level in record_level()) {
        let record = LogRecord::new("prop", level, message);
        let formatter = JsonFormatter::new();
        let mut buffer = rust_sink_logger::formatter::FormatBuffer::new();
        formatter.format(&record, &mut buffer);

        let value: serde_json::Value = serde_json::from_str(buffer.as_str().trim_end()).unwrap();
        prop_assert_eq!(value["message"].as_str(), Some(record.message.as_str()));
        prop_assert_eq!(value["level"].as_str(), Some(level.to_str()));
    }
}

// ============================================================================
// Level Filtering Tests
// ============================================================================

proptest! {
    /// A logger threshold lets through exactly the levels at or above it
    #[test]
    fn test_threshold_filters_lower_levels(threshold in any_level()) {
        let ring = Arc::new(RingBufferSink::new(16));
        let logger = Logger::builder()
            .level(threshold)
            .sinks([ring.clone() as Arc<dyn Sink>])
            .pattern("%L")
            .build()
            .unwrap();

        for level in &LogLevel::ALL[..6] {
            logger.log(*level, "x");
        }

        let expected: Vec<String> = LogLevel::ALL[..6]
            .iter()
            .filter(|level| **level >= threshold)
            .map(|level| level.short_name().to_string())
            .collect();
        prop_assert_eq!(ring.last(16), expected);
    }

    /// The effective threshold is the stricter of logger and sink levels
    #[test]
    fn test_sink_level_stacks_with_logger_level(
        logger_level in record_level(),
        sink_level in record_level(),
        level in record_level(),
    ) {
        let ring = Arc::new(RingBufferSink::new(4));
        ring.set_level(sink_level);
        let logger = Logger::builder()
            .level(logger_level)
            .sinks([ring.clone() as Arc<dyn Sink>])
            .build()
            .unwrap();

        logger.log(level, "x");
        prop_assert_eq!(ring.len() == 1, level >= logger_level && level >= sink_level);
    }
}

// ============================================================================
// LevelSpec Tests
// ============================================================================

proptest! {
    /// A level spec printed with Display parses back unchanged
    #[test]
    fn test_level_spec_display_roundtrip(
        default in any_level(),
        overrides in prop::collection::btree_map("[a-z][a-z0-9_.]{0,7}", any_level(), 0..5),
    ) {
        let spec = overrides
            .iter()
            .fold(LevelSpec::new().with_default(default), |spec, (name, level)| {
                spec.with_logger(name.clone(), *level)
            });

        let parsed: LevelSpec = spec.to_string().parse().unwrap();
        prop_assert_eq!(&parsed, &spec);
    }

    /// Loggers without an override fall back to the default
    #[test]
    fn test_level_spec_lookup(
        default in any_level(),
        overrides in prop::collection::btree_map("[a-z]{1,6}", any_level(), 0..5),
        lookup in "[a-z]{1,6}",
    ) {
        let spec = overrides
            .iter()
            .fold(LevelSpec::new().with_default(default), |spec, (name, level)| {
                spec.with_logger(name.clone(), *level)
            });
        let expected = overrides.get(&lookup).copied().unwrap_or(default);
        prop_assert_eq!(spec.level_for(&lookup), Some(expected));
    }
}

#[test]
fn test_level_spec_rejects_bad_entries() {
    assert!("info,=debug".parse::<LevelSpec>().is_err());
    assert!("loud".parse::<LevelSpec>().is_err());
    assert!("net=loud".parse::<LevelSpec>().is_err());
    assert_eq!("".parse::<LevelSpec>().unwrap(), LevelSpec::new());

    let spec = "a=debug, b=off".parse::<LevelSpec>().unwrap();
    let overrides: BTreeMap<&str, LogLevel> = spec.overrides().collect();
    assert_eq!(overrides.len(), 2);
    assert_eq!(overrides["b"], LogLevel::Off);
}

// ============================================================================
// Rotation Naming Tests
// ============================================================================

proptest! {
    /// The index goes between the stem and the extension
    #[test]
    fn test_calc_filename_with_extension(
        stem in "[a-z]{1,8}",
        ext in "[a-z]{1,4}",
        index in 1usize..1000,
    ) {
        prop_assert_eq!(
            calc_filename(format!("{}.{}", stem, ext), index),
            PathBuf::from(format!("{}.{}.{}", stem, index, ext))
        );
    }

    #[test]
    fn test_calc_filename_without_extension(stem in "[a-z]{1,8}", index in 1usize..1000) {
        prop_assert_eq!(
            calc_filename(&stem, index),
            PathBuf::from(format!("{}.{}", stem, index))
        );
    }

    /// Index zero names the base file itself
    #[test]
    fn test_calc_filename_index_zero(name in "[a-z]{1,8}(\\.[a-z]{1,4})?") {
        prop_assert_eq!(calc_filename(&name, 0), PathBuf::from(&name));
    }
}
