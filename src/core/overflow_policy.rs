//! Overflow policies for the async queue
//!
//! When the async queue is full, the policy decides what the producer does.
//! Every policy that loses a record counts it, so loss is never silent.

use super::error::LoggerError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full async queue
///
/// # Example
///
/// ```
/// use rust_sink_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: wait for space
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::Block);
///
/// // Wait a bounded time, then drop
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Block until space is available
    ///
    /// No record is lost, at the cost of backpressure on the caller.
    #[default]
    Block,

    /// Block with timeout, then drop the incoming record
    BlockWithTimeout(Duration),

    /// Drop the incoming record; the producer never waits
    DropNewest,

    /// Evict the earliest unconsumed record to make room; the producer never waits
    DropOldest,
}

impl OverflowPolicy {
    /// True for policies under which a producer can wait
    pub fn may_block(&self) -> bool {
        matches!(
            self,
            OverflowPolicy::Block | OverflowPolicy::BlockWithTimeout(_)
        )
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "block_timeout:{}", d.as_millis()),
            OverflowPolicy::DropNewest => write!(f, "drop_newest"),
            OverflowPolicy::DropOldest => write!(f, "drop_oldest"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = LoggerError;

    /// Parse `block`, `drop_newest`, `drop_oldest` or `block_timeout:<ms>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "drop_newest" => Ok(OverflowPolicy::DropNewest),
            "drop_oldest" => Ok(OverflowPolicy::DropOldest),
            other => {
                let millis = other
                    .strip_prefix("block_timeout:")
                    .and_then(|ms| ms.trim().parse::<u64>().ok())
                    .ok_or_else(|| {
                        LoggerError::config(
                            "OverflowPolicy",
                            format!("unknown overflow policy '{}'", other),
                        )
                    })?;
                Ok(OverflowPolicy::BlockWithTimeout(Duration::from_millis(millis)))
            }
        }
    }
}

/// Callback type for overflow notifications
///
/// Called each time a record is lost to overflow.
/// The parameter is the total count of lost records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
