//! Basic logger usage example
//!
//! Demonstrates synchronous logging to the console, level thresholds,
//! patterns, structured fields and the logging macros.
//!
//! Run with: cargo run --example basic_usage

use rust_sink_logger::prelude::*;
use rust_sink_logger::{critical, info, warn};

fn main() -> Result<()> {
    println!("=== Rust Sink Logger - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .name("basic")
        .level(LogLevel::Trace)
        .sink(ConsoleSink::new())
        .build()?;

    println!("1. Logging at different levels:");
    logger.trace("This is a trace message");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.critical("This is a critical message");

    println!("\n2. Raising the threshold to INFO - trace and debug won't show:");
    logger.set_level(LogLevel::Info);
    logger.trace("Trace message (hidden)");
    logger.debug("Debug message (hidden)");
    logger.info("Info message (visible)");

    println!("\n3. Custom pattern and structured fields:");
    logger.set_pattern("%H:%M:%S.%e %-8l %n: %v%*")?;
    logger.info_with_fields(
        "User logged in",
        LogContext::new()
            .with_field("user_id", 42)
            .with_field("method", "password"),
    );

    println!("\n4. Macros with format arguments:");
    let port = 8080;
    info!(logger, "Listening on port {}", port);
    warn!(logger, "Cache hit ratio low: {:.1}%", 12.5);
    critical!(logger, "Disk {} is {}% full", "/dev/sda1", 99);

    println!("\n5. The global default logger:");
    info!("Hello from the default logger");

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
