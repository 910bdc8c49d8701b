//! Criterion benchmarks for rust_sink_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_sink_logger::formatter::FormatBuffer;
use rust_sink_logger::prelude::*;
use std::sync::Arc;

fn null_logger(level: LogLevel) -> Logger {
    Logger::builder()
        .name("bench")
        .level(level)
        .sink(NullSink::new())
        .build()
        .unwrap()
}

fn sample_record() -> LogRecord {
    LogRecord::new("bench", LogLevel::Info, "User logged in").with_fields(
        LogContext::new()
            .with_field("user_id", 12345)
            .with_field("ip", "192.168.1.1")
            .with_field("success", true),
    )
}

// ============================================================================
// Logger Creation Benchmarks
// ============================================================================

fn bench_logger_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("new_sync", |b| {
        b.iter(|| black_box(Logger::new("bench")));
    });

    group.bench_function("builder_with_pattern", |b| {
        b.iter(|| {
            black_box(
                Logger::builder()
                    .name("bench")
                    .sink(NullSink::new())
                    .pattern("[%H:%M:%S] %v")
                    .build()
                    .unwrap(),
            )
        });
    });

    group.finish();
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_sync_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_logging");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Trace);

    group.bench_function("info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("info_with_fields", |b| {
        b.iter(|| {
            logger.info_with_fields(
                black_box("Request handled"),
                LogContext::new().with_field("status", 200),
            )
        });
    });

    group.bench_function("macro_with_args", |b| {
        b.iter(|| rust_sink_logger::info!(logger, "Processed {} items", black_box(42)));
    });

    group.finish();
}

fn bench_async_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_logging");
    group.throughput(Throughput::Elements(1));

    for (name, policy) in [
        ("block", OverflowPolicy::Block),
        ("drop_newest", OverflowPolicy::DropNewest),
        ("drop_oldest", OverflowPolicy::DropOldest),
    ] {
        let logger = Logger::builder()
            .name("bench")
            .sink(NullSink::new())
            .async_mode(8192)
            .overflow_policy(policy)
            .build()
            .unwrap();

        group.bench_function(name, |b| {
            b.iter(|| logger.info(black_box("Async message")));
        });
        logger.flush();
    }

    group.finish();
}

fn bench_shared_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_queue");
    group.throughput(Throughput::Elements(4));

    let queue = Arc::new(AsyncQueue::spawn(AsyncConfig::new(8192).workers(2)).unwrap());
    let loggers: Vec<Logger> = (0..4)
        .map(|i| {
            Logger::builder()
                .name(format!("bench-{}", i))
                .sink(NullSink::new())
                .async_queue(Arc::clone(&queue))
                .build()
                .unwrap()
        })
        .collect();

    group.bench_function("four_loggers", |b| {
        b.iter(|| {
            for logger in &loggers {
                logger.info(black_box("Shared message"));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let record = sample_record();
    let formatters: Vec<(&str, Box<dyn Formatter>)> = vec![
        ("pattern_default", Box::new(PatternFormatter::default())),
        (
            "pattern_padded",
            Box::new(PatternFormatter::new("%-8l %20n %v").unwrap()),
        ),
        ("json", Box::new(JsonFormatter::new())),
        ("logfmt", Box::new(LogfmtFormatter::new())),
    ];

    for (name, formatter) in &formatters {
        let mut buffer = FormatBuffer::with_capacity(256);
        group.bench_function(*name, |b| {
            b.iter(|| {
                buffer.clear();
                formatter.format(black_box(&record), &mut buffer);
                black_box(buffer.len())
            });
        });
    }

    group.bench_function("pattern_compile", |b| {
        b.iter(|| black_box(PatternFormatter::new(black_box("[%Y-%m-%d %T.%e] [%n] [%^%l%$] %v"))));
    });

    group.finish();
}

// ============================================================================
// Level Filtering Benchmarks
// ============================================================================

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Error);

    group.bench_function("filtered_out", |b| {
        b.iter(|| logger.debug(black_box("Filtered message")));
    });

    group.bench_function("filtered_macro", |b| {
        b.iter(|| rust_sink_logger::debug!(logger, "Filtered {}", black_box(7)));
    });

    group.bench_function("passed_through", |b| {
        b.iter(|| logger.error(black_box("Passed message")));
    });

    group.finish();
}

fn bench_backtrace(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtrace");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Error);
    logger.enable_backtrace(32);

    group.bench_function("capture_filtered", |b| {
        b.iter(|| logger.debug(black_box("Captured for later")));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_logger_creation,
    bench_sync_logging,
    bench_async_logging,
    bench_shared_queue,
    bench_formatting,
    bench_level_filtering,
    bench_backtrace,
);

criterion_main!(benches);
