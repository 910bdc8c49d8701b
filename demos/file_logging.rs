//! File logging example
//!
//! Demonstrates plain and rotating file sinks, JSON output and
//! configuring a registry from JSON.
//!
//! Run with: cargo run --example file_logging

use rust_sink_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Rust Sink Logger - File Logging Example ===\n");

    println!("1. Plain file logging:");
    let app = Logger::builder()
        .name("app")
        .sink(FileSink::new("application.log")?)
        .flush_level(LogLevel::Error)
        .build()?;
    app.info("Application started");
    app.error("Flushed right away because of flush_on(error)");
    println!("   Logged to: application.log");

    println!("\n2. Rotating file logging (1 KiB per file, 3 backups):");
    let rotating = Logger::builder()
        .name("rotating")
        .sink(RotatingFileSink::with_policy(
            "rotating.log",
            RotationPolicy::new().with_max_size(1024).with_max_files(3),
        )?)
        .build()?;
    for i in 0..100 {
        rotating.info(format!("Log message #{} - enough text to trigger rotation", i));
    }
    rotating.flush();
    println!("   Check rotating.log and rotating.1.log .. rotating.3.log");

    println!("\n3. JSON lines:");
    let json = Logger::builder()
        .name("json")
        .sink(FileSink::new("structured.log")?)
        .formatter(Box::new(JsonFormatter::new()))
        .build()?;
    json.info_with_fields(
        "Order placed",
        LogContext::new()
            .with_field("order_id", 1001)
            .with_field("total", 99.5),
    );
    json.flush();
    println!("   Logged to: structured.log");

    println!("\n4. Configuring a registry from JSON:");
    let registry = Registry::new();
    registry.register(Logger::builder().name("net").sink(ConsoleSink::new()).build()?)?;
    LoggingConfig::from_json(
        r#"{ "level": "warn", "loggers": { "net": "debug" }, "pattern": "[%n] [%l] %v" }"#,
    )?
    .apply(&registry)?;
    if let Some(net) = registry.get("net") {
        net.debug("Visible because of the per-logger override");
    }
    registry.shutdown();

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
