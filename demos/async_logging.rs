//! Async logging example
//!
//! Demonstrates queued logging from many threads, overflow policies and a
//! queue shared by several loggers.
//!
//! Run with: cargo run --example async_logging

use rust_sink_logger::core::{AsyncConfig, AsyncQueue, DEFAULT_SHUTDOWN_TIMEOUT};
use rust_sink_logger::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Sink Logger - Async Logging Example ===\n");

    let logger = Arc::new(
        Logger::builder()
            .name("async")
            .sink(ConsoleSink::new())
            .sink(FileSink::new("async_test.log")?)
            .async_mode(1000)
            .build()?,
    );

    println!("1. High-throughput async logging:");
    for i in 0..100 {
        logger.info(format!("Message #{}", i));
    }
    println!("   Logged 100 messages asynchronously");

    println!("\n2. Multi-threaded logging:");
    let handles: Vec<_> = (0..4)
        .map(|thread_id| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..10 {
                    logger.info(format!("Thread {} - message {}", thread_id, i));
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    println!("   Flush status: {:?}", logger.flush());

    println!("\n3. Dropping the oldest records when the queue is full:");
    let lossy = Logger::builder()
        .name("lossy")
        .sink(NullSink::new())
        .async_mode(8)
        .overflow_policy(OverflowPolicy::DropOldest)
        .build()?;
    for i in 0..10_000 {
        lossy.info(format!("burst {}", i));
    }
    lossy.flush();
    if let Some(queue) = lossy.async_queue() {
        println!(
            "   Enqueued {}, overrun {}",
            queue.metrics().enqueued(),
            queue.metrics().overrun()
        );
    }

    println!("\n4. One queue shared by two loggers:");
    let queue = Arc::new(AsyncQueue::spawn(AsyncConfig::new(256).workers(2))?);
    for name in ["db", "http"] {
        let shared = Logger::builder()
            .name(name)
            .sink(ConsoleSink::new())
            .pattern("[%n] %v")
            .async_queue(Arc::clone(&queue))
            .build()?;
        shared.info(format!("{} logger on the shared queue", name));
        shared.flush();
    }
    queue.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

    println!("\n=== Example completed successfully! ===");
    println!("Check async_test.log for logged messages");

    Ok(())
}
