//! Error handler invoked when a sink fails

use super::error::LoggerError;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A sink failure as seen by an error handler
#[derive(Debug)]
pub struct SinkFailure<'a> {
    /// Logger whose record could not be written
    pub logger: &'a str,
    /// Sink that failed; empty when the failure happened before any sink
    pub sink: &'a str,
    pub error: &'a LoggerError,
}

impl fmt::Display for SinkFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sink.is_empty() {
            write!(f, "logger '{}': {}", self.logger, self.error)
        } else {
            write!(
                f,
                "logger '{}' sink '{}': {}",
                self.logger, self.sink, self.error
            )
        }
    }
}

/// Callback receiving every sink failure
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{ErrorHandler, SinkFailure};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let failures = Arc::new(AtomicUsize::new(0));
/// let counter = failures.clone();
/// let handler: ErrorHandler = Arc::new(move |failure: &SinkFailure<'_>| {
///     counter.fetch_add(1, Ordering::Relaxed);
///     eprintln!("log failure: {}", failure);
/// });
/// ```
pub type ErrorHandler = Arc<dyn Fn(&SinkFailure<'_>) + Send + Sync>;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Handler writing `[LOGGER ERROR] ...` to stderr, at most once per second
///
/// Failures inside the quiet period are counted and the count is included in
/// the next report.
pub fn default_error_handler() -> ErrorHandler {
    let last_report: Mutex<Option<Instant>> = Mutex::new(None);
    let suppressed = AtomicU64::new(0);

    Arc::new(move |failure: &SinkFailure<'_>| {
        let now = Instant::now();
        let mut last = last_report.lock();
        if last.is_some_and(|at| now.duration_since(at) < REPORT_INTERVAL) {
            suppressed.fetch_add(1, Ordering::Relaxed);
            return;
        }
        *last = Some(now);
        drop(last);

        let skipped = suppressed.swap(0, Ordering::Relaxed);
        if skipped > 0 {
            eprintln!(
                "[LOGGER ERROR] {} ({} similar errors suppressed)",
                failure, skipped
            );
        } else {
            eprintln!("[LOGGER ERROR] {}", failure);
        }
    })
}

/// Run `handler`, isolating a panic inside it
pub(crate) fn report(handler: &ErrorHandler, failure: &SinkFailure<'_>) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(failure))) {
        eprintln!(
            "[LOGGER WARNING] error handler panicked while reporting {}: {}",
            failure,
            panic_message(panic.as_ref())
        );
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let error = LoggerError::writer("disk full");
        let failure = SinkFailure {
            logger: "svc",
            sink: "file",
            error: &error,
        };
        assert_eq!(
            failure.to_string(),
            "logger 'svc' sink 'file': Writer error: disk full"
        );
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let handler: ErrorHandler = Arc::new(|_| panic!("handler bug"));
        let error = LoggerError::other("x");
        report(
            &handler,
            &SinkFailure {
                logger: "svc",
                sink: "null",
                error: &error,
            },
        );
    }

    #[test]
    fn test_default_handler_does_not_panic_when_flooded() {
        let handler = default_error_handler();
        let error = LoggerError::other("x");
        for _ in 0..100 {
            report(
                &handler,
                &SinkFailure {
                    logger: "svc",
                    sink: "null",
                    error: &error,
                },
            );
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
