//! Bounded async queue served by a pool of worker threads
//!
//! Producers hand records to the queue and return; workers dispatch them to
//! the owning logger's sinks. When the queue is full the configured
//! [`OverflowPolicy`] decides whether the producer waits or a record is lost,
//! and every loss is counted.

use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use super::logger::{FlushStatus, LoggerCore};
use super::metrics::QueueMetrics;
use super::overflow_policy::{OverflowCallback, OverflowPolicy};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default timeout for draining the queue on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the registry's shared queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// Lifecycle of an [`AsyncQueue`]
///
/// `Idle → Running → Draining → Stopped`; records are accepted only while
/// `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QueueState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl QueueState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => QueueState::Idle,
            1 => QueueState::Running,
            2 => QueueState::Draining,
            _ => QueueState::Stopped,
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueState::Idle => "idle",
            QueueState::Running => "running",
            QueueState::Draining => "draining",
            QueueState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Capacity, worker count and overflow handling of a queue
///
/// # Example
///
/// ```
/// use rust_sink_logger::core::{AsyncConfig, AsyncQueue};
/// use rust_sink_logger::OverflowPolicy;
///
/// let queue = AsyncQueue::spawn(
///     AsyncConfig::new(1024)
///         .workers(2)
///         .policy(OverflowPolicy::DropOldest),
/// )
/// .unwrap();
/// assert_eq!(queue.worker_count(), 2);
/// ```
#[derive(Clone)]
pub struct AsyncConfig {
    pub capacity: usize,
    pub workers: usize,
    pub policy: OverflowPolicy,
    pub on_overflow: Option<OverflowCallback>,
}

impl AsyncConfig {
    /// One worker, `Block` policy
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            workers: 1,
            policy: OverflowPolicy::default(),
            on_overflow: None,
        }
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(LoggerError::config("AsyncQueue", "capacity must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(LoggerError::config("AsyncQueue", "worker count must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl fmt::Debug for AsyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncConfig")
            .field("capacity", &self.capacity)
            .field("workers", &self.workers)
            .field("policy", &self.policy)
            .field("on_overflow", &self.on_overflow.is_some())
            .finish()
    }
}

/// Tickets of one logger's records that are queued or being written
///
/// A flush waits until every ticket issued before it has settled, which
/// covers records still in the hands of another worker.
#[derive(Default)]
pub(crate) struct InFlight {
    state: Mutex<InFlightState>,
    settled: Condvar,
}

#[derive(Default)]
struct InFlightState {
    next: u64,
    pending: BTreeSet<u64>,
    waiters: usize,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a record about to be queued
    pub(crate) fn begin(&self) -> u64 {
        let mut state = self.state.lock();
        let ticket = state.next;
        state.next += 1;
        state.pending.insert(ticket);
        ticket
    }

    /// The record behind `ticket` was written or lost
    pub(crate) fn finish(&self, ticket: u64) {
        let mut state = self.state.lock();
        state.pending.remove(&ticket);
        if state.waiters > 0 {
            self.settled.notify_all();
        }
    }

    /// Tickets below the returned mark were issued before this call
    pub(crate) fn mark(&self) -> u64 {
        self.state.lock().next
    }

    /// Wait until every ticket below `mark` has settled; `false` on timeout
    pub(crate) fn wait_settled(&self, mark: u64, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        state.waiters += 1;
        let settled = loop {
            if state.pending.first().map_or(true, |oldest| *oldest >= mark) {
                break true;
            }
            if self.settled.wait_until(&mut state, deadline).timed_out() {
                break state.pending.first().map_or(true, |oldest| *oldest >= mark);
            }
        };
        state.waiters -= 1;
        settled
    }
}

pub(crate) enum QueueMessage {
    Log {
        core: Arc<LoggerCore>,
        record: LogRecord,
        ticket: u64,
    },
    Flush {
        core: Arc<LoggerCore>,
        ack: Sender<FlushStatus>,
    },
    Terminate,
}

/// Bounded multi-producer queue with N worker threads
///
/// One queue can serve many loggers. Records from a single producer reach
/// the sinks in enqueue order when the queue has one worker; with several
/// workers dequeue order is still FIFO but processing may interleave.
pub struct AsyncQueue {
    config: AsyncConfig,
    sender: Sender<QueueMessage>,
    // Kept so DropOldest can evict from the head, and so shutdown can drain
    // whatever arrived behind the terminate markers.
    receiver: Receiver<QueueMessage>,
    state: AtomicU8,
    workers: Mutex<Vec<JoinHandle<()>>>,
    // Terminate markers a DropOldest producer evicted and could not put back
    lost_terminates: AtomicUsize,
    metrics: QueueMetrics,
}

impl AsyncQueue {
    /// Create an idle queue; call [`start`](Self::start) to spawn workers
    pub fn new(config: AsyncConfig) -> Result<Self> {
        config.validate()?;
        let (sender, receiver) = bounded(config.capacity);
        Ok(Self {
            config,
            sender,
            receiver,
            state: AtomicU8::new(QueueState::Idle as u8),
            workers: Mutex::new(Vec::new()),
            lost_terminates: AtomicUsize::new(0),
            metrics: QueueMetrics::new(),
        })
    }

    /// Create a queue and start its workers
    pub fn spawn(config: AsyncConfig) -> Result<Self> {
        let queue = Self::new(config)?;
        queue.start()?;
        Ok(queue)
    }

    /// Spawn the worker threads; a no-op while already running
    pub fn start(&self) -> Result<()> {
        let mut workers = self.workers.lock();
        match self.state() {
            QueueState::Idle => {}
            QueueState::Running => return Ok(()),
            state => return Err(LoggerError::queue_not_running(state)),
        }

        for index in 0..self.config.workers {
            let receiver = self.receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("logger-worker-{}", index))
                .spawn(move || worker_loop(receiver));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    for _ in 0..workers.len() {
                        let _ = self.sender.send(QueueMessage::Terminate);
                    }
                    for handle in workers.drain(..) {
                        let _ = handle.join();
                    }
                    self.set_state(QueueState::Stopped);
                    return Err(LoggerError::io_operation(
                        "spawning async worker",
                        e.to_string(),
                        e,
                    ));
                }
            }
        }

        self.set_state(QueueState::Running);
        Ok(())
    }

    pub fn state(&self) -> QueueState {
        QueueState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: QueueState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Hand `record` to the workers, applying the overflow policy when full
    pub(crate) fn enqueue(&self, core: &Arc<LoggerCore>, record: LogRecord) {
        let state = self.state();
        if state != QueueState::Running {
            self.metrics.record_rejected();
            core.report_dropped(&LoggerError::queue_not_running(state));
            self.notify_overflow();
            return;
        }

        let ticket = core.in_flight().begin();
        let message = QueueMessage::Log {
            core: Arc::clone(core),
            record,
            ticket,
        };
        match self.config.policy {
            OverflowPolicy::Block => self.send_blocking(core, message, ticket),
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.send_with_timeout(core, message, ticket, timeout)
            }
            OverflowPolicy::DropNewest => match self.sender.try_send(message) {
                Ok(()) => self.metrics.record_enqueued(),
                Err(_) => {
                    self.metrics.record_dropped_newest();
                    self.lost(core, ticket);
                }
            },
            OverflowPolicy::DropOldest => self.send_evicting(core, message, ticket),
        }
    }

    fn send_blocking(&self, core: &LoggerCore, message: QueueMessage, ticket: u64) {
        let message = match self.sender.try_send(message) {
            Ok(()) => {
                self.metrics.record_enqueued();
                return;
            }
            Err(TrySendError::Full(message)) => message,
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped_newest();
                self.lost(core, ticket);
                return;
            }
        };

        self.metrics.record_block();
        if self.sender.send(message).is_ok() {
            self.metrics.record_enqueued();
        } else {
            self.metrics.record_dropped_newest();
            self.lost(core, ticket);
        }
    }

    fn send_with_timeout(
        &self,
        core: &LoggerCore,
        message: QueueMessage,
        ticket: u64,
        timeout: Duration,
    ) {
        let message = match self.sender.try_send(message) {
            Ok(()) => {
                self.metrics.record_enqueued();
                return;
            }
            Err(TrySendError::Full(message)) => message,
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped_newest();
                self.lost(core, ticket);
                return;
            }
        };

        self.metrics.record_block();
        match self.sender.send_timeout(message, timeout) {
            Ok(()) => self.metrics.record_enqueued(),
            Err(SendTimeoutError::Timeout(_)) => {
                self.metrics.record_block_timeout();
                self.metrics.record_dropped_newest();
                self.lost(core, ticket);
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                self.metrics.record_dropped_newest();
                self.lost(core, ticket);
            }
        }
    }

    /// Evict from the head until `message` fits; never waits
    fn send_evicting(&self, core: &LoggerCore, mut message: QueueMessage, ticket: u64) {
        let mut terminates = 0;
        loop {
            match self.sender.try_send(message) {
                Ok(()) => {
                    self.metrics.record_enqueued();
                    break;
                }
                Err(TrySendError::Full(returned)) => {
                    message = returned;
                    match self.receiver.try_recv() {
                        Ok(QueueMessage::Log {
                            core: evicted,
                            ticket: evicted_ticket,
                            ..
                        }) => {
                            self.metrics.record_overrun();
                            evicted.in_flight().finish(evicted_ticket);
                            evicted.metrics().record_dropped();
                            self.notify_overflow();
                        }
                        Ok(QueueMessage::Flush { core: flushed, ack }) => {
                            let _ = ack.send(flushed.flush_sinks());
                        }
                        Ok(QueueMessage::Terminate) => terminates += 1,
                        // A worker emptied a slot first
                        Err(_) => {}
                    }
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.metrics.record_dropped_newest();
                    self.lost(core, ticket);
                    break;
                }
            }
        }

        // Shutdown re-sends whatever does not fit
        for _ in 0..terminates {
            if self.sender.try_send(QueueMessage::Terminate).is_err() {
                self.lost_terminates.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    fn lost(&self, core: &LoggerCore, ticket: u64) {
        core.in_flight().finish(ticket);
        core.metrics().record_dropped();
        self.notify_overflow();
    }

    fn notify_overflow(&self) {
        if let Some(callback) = &self.config.on_overflow {
            callback(self.metrics.total_lost());
        }
    }

    /// Flush `core`'s sinks once every record queued before this call is written
    ///
    /// Waits at most `timeout` in total: first until every record `core`
    /// queued earlier has been written by whichever worker took it, then for
    /// the worker's acknowledgement of the flush itself. The wait happens on
    /// the calling thread so workers never stall on each other. When the
    /// queue is not running, the sinks are flushed on the calling thread.
    pub(crate) fn flush(&self, core: &Arc<LoggerCore>, timeout: Duration) -> FlushStatus {
        if self.state() != QueueState::Running {
            return core.flush_sinks();
        }

        let started = Instant::now();
        let mark = core.in_flight().mark();
        if !core.in_flight().wait_settled(mark, started + timeout) {
            return FlushStatus::TimedOut {
                waited: started.elapsed(),
            };
        }

        let (ack, done) = bounded(1);
        let message = QueueMessage::Flush {
            core: Arc::clone(core),
            ack,
        };
        match self.sender.send_timeout(message, timeout.saturating_sub(started.elapsed())) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                return FlushStatus::TimedOut {
                    waited: started.elapsed(),
                }
            }
            Err(SendTimeoutError::Disconnected(_)) => return core.flush_sinks(),
        }

        match done.recv_timeout(timeout.saturating_sub(started.elapsed())) {
            Ok(status) => status,
            Err(RecvTimeoutError::Timeout) => FlushStatus::TimedOut {
                waited: started.elapsed(),
            },
            Err(RecvTimeoutError::Disconnected) => core.flush_sinks(),
        }
    }

    /// Drain queued records, stop the workers and join them within `timeout`
    ///
    /// Returns `false` if a worker did not finish in time; records still
    /// queued by then may be lost. Calling this again is a no-op that
    /// returns `true`.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_sink_logger::core::{AsyncConfig, AsyncQueue, QueueState, DEFAULT_SHUTDOWN_TIMEOUT};
    ///
    /// let queue = AsyncQueue::spawn(AsyncConfig::new(64)).unwrap();
    /// assert!(queue.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));
    /// assert_eq!(queue.state(), QueueState::Stopped);
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let mut workers = self.workers.lock();
        match self.state() {
            QueueState::Stopped => return true,
            QueueState::Idle => {
                self.set_state(QueueState::Stopped);
                return true;
            }
            QueueState::Running | QueueState::Draining => {}
        }
        self.set_state(QueueState::Draining);

        let deadline = Instant::now() + timeout;
        for _ in 0..workers.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if self.sender.send_timeout(QueueMessage::Terminate, remaining).is_err() {
                break;
            }
        }

        let mut finished = true;
        for handle in workers.drain(..) {
            loop {
                self.resend_lost_terminates();
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Async worker thread panicked during shutdown: {:?}",
                            e
                        );
                        finished = false;
                    }
                    break;
                }
                if Instant::now() >= deadline {
                    finished = false;
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }

        if finished {
            self.drain_inline();
        } else {
            eprintln!(
                "[LOGGER WARNING] Async workers did not finish within {:?}; {} queued records may be lost",
                timeout,
                self.sender.len()
            );
        }

        self.set_state(QueueState::Stopped);
        finished
    }

    /// Put back terminate markers that producers evicted from a full queue
    fn resend_lost_terminates(&self) {
        let lost = self.lost_terminates.swap(0, Ordering::AcqRel);
        for _ in 0..lost {
            if self.sender.try_send(QueueMessage::Terminate).is_err() {
                self.lost_terminates.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    /// Process whatever arrived after the workers stopped
    fn drain_inline(&self) {
        let mut touched = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            process(message, &mut touched);
        }
        flush_touched(&mut touched);
    }

    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn worker_count(&self) -> usize {
        self.config.workers
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.config.policy
    }

    /// Messages currently waiting
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

impl fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for AsyncQueue {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

fn worker_loop(receiver: Receiver<QueueMessage>) {
    let mut touched: Vec<Arc<LoggerCore>> = Vec::new();
    while let Ok(first) = receiver.recv() {
        let mut next = Some(first);
        while let Some(message) = next.take() {
            if !process(message, &mut touched) {
                flush_touched(&mut touched);
                return;
            }
            next = receiver.try_recv().ok();
        }
        // Queue went empty
        flush_touched(&mut touched);
    }
}

/// Handle one message; `false` on terminate
fn process(message: QueueMessage, touched: &mut Vec<Arc<LoggerCore>>) -> bool {
    match message {
        QueueMessage::Log {
            core,
            record,
            ticket,
        } => {
            core.dispatch(&record);
            core.in_flight().finish(ticket);
            if !touched.iter().any(|seen| Arc::ptr_eq(seen, &core)) {
                touched.push(core);
            }
            true
        }
        QueueMessage::Flush { core, ack } => {
            let _ = ack.send(core.flush_sinks());
            true
        }
        QueueMessage::Terminate => false,
    }
}

fn flush_touched(touched: &mut Vec<Arc<LoggerCore>>) {
    for core in touched.drain(..) {
        core.flush_sinks();
    }
}
