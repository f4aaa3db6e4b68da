//! Logger provider: one queue, one worker, one sink
//!
//! Loggers push finished [`LogMessage`]s into an unbounded crossbeam channel. A single
//! background thread drains it in FIFO order and dispatches to the sink. Bulk sinks
//! get micro-batches collected over a short window; simple sinks get messages one
//! by one as soon as they arrive.

use super::{
    error::Result,
    log_level::LogLevel,
    log_message::LogMessage,
    logger::Logger,
    metrics::ProviderMetrics,
    pool::FixSizePool,
    sink::{BulkSink, Sink},
    web_context::WebContextSource,
};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for provider cleanup (5 seconds)
///
/// Used when the provider is dropped without an explicit [`LoggerProvider::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_BATCH_SIZE: usize = 20;

pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(500);

pub const DEFAULT_MESSAGE_POOL_CAPACITY: usize = 8 * 1024;

/// Settings of a [`LoggerProvider`].
#[derive(Clone)]
pub struct ProviderOptions {
    /// Upper bound of messages handed to one bulk queue
    pub batch_size: usize,
    /// How long the worker keeps collecting after the first message of a batch
    pub batch_window: Duration,
    /// Bounded wait for the worker on dispose
    pub shutdown_timeout: Duration,
    pub min_level: LogLevel,
    pub message_pool_capacity: usize,
    pub context_source: Option<Arc<dyn WebContextSource>>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_window: DEFAULT_BATCH_WINDOW,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            min_level: LogLevel::Trace,
            message_pool_capacity: DEFAULT_MESSAGE_POOL_CAPACITY,
            context_source: None,
        }
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("batch_size", &self.batch_size)
            .field("batch_window", &self.batch_window)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("min_level", &self.min_level)
            .field("message_pool_capacity", &self.message_pool_capacity)
            .field("context_source", &self.context_source.is_some())
            .finish()
    }
}

/// State shared by the provider, its loggers and the worker.
pub(crate) struct ProviderShared {
    sender: RwLock<Option<Sender<Box<LogMessage>>>>,
    pool: FixSizePool<LogMessage>,
    metrics: Arc<ProviderMetrics>,
    min_level: LogLevel,
    context_source: Option<Arc<dyn WebContextSource>>,
}

impl ProviderShared {
    #[inline]
    pub(crate) fn min_level(&self) -> LogLevel {
        self.min_level
    }

    #[inline]
    pub(crate) fn context_source(&self) -> Option<&Arc<dyn WebContextSource>> {
        self.context_source.as_ref()
    }

    #[inline]
    pub(crate) fn rent_message(&self) -> Option<Box<LogMessage>> {
        self.pool.try_rent()
    }

    pub(crate) fn recycle(&self, mut message: Box<LogMessage>) {
        message.clear();
        self.pool.give_back(message);
    }

    /// Enqueue a message. Never blocks: the channel is unbounded.
    ///
    /// Returns `false` when the message was dropped because the provider has been
    /// disposed or its worker is gone.
    pub(crate) fn push(&self, message: Box<LogMessage>) -> bool {
        let guard = self.sender.read();
        let rejected = match guard.as_ref() {
            Some(sender) => match sender.send(message) {
                Ok(()) => {
                    self.metrics.record_pushed();
                    return true;
                }
                Err(err) => err.into_inner(),
            },
            None => message,
        };
        drop(guard);
        self.metrics.record_dropped();
        self.recycle(rejected);
        false
    }
}

struct Worker {
    thread: thread::JoinHandle<()>,
    /// Dropping this sender cancels the worker at its next wait.
    cancel: Sender<()>,
}

/// Owner of the message queue and the background worker.
///
/// # Example
///
/// ```no_run
/// use rust_sink_logging::prelude::*;
///
/// let sink = FormattedSink::from_uri("stdout").unwrap();
/// let provider = LoggerProvider::new(sink);
/// let logger = provider.create_logger("app");
/// logger.info("started");
/// provider.dispose();
/// ```
pub struct LoggerProvider {
    shared: Arc<ProviderShared>,
    sink: Arc<dyn Sink>,
    options: ProviderOptions,
    worker: Mutex<Option<Worker>>,
    started: AtomicBool,
    disposed: AtomicBool,
}

impl LoggerProvider {
    pub fn new<S: Sink + 'static>(sink: S) -> Self {
        Self::with_options(Arc::new(sink), ProviderOptions::default())
    }

    pub fn with_options(sink: Arc<dyn Sink>, options: ProviderOptions) -> Self {
        let capacity = options
            .message_pool_capacity
            .clamp(1, super::pool::MAX_POOL_CAPACITY);
        let shared = Arc::new(ProviderShared {
            sender: RwLock::new(None),
            pool: FixSizePool::new(capacity),
            metrics: Arc::new(ProviderMetrics::new()),
            min_level: options.min_level,
            context_source: options.context_source.clone(),
        });
        Self {
            shared,
            sink,
            options,
            worker: Mutex::new(None),
            started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::new()
    }

    /// Create a logger for `category`. The worker starts with the first logger.
    pub fn create_logger(&self, category: impl Into<String>) -> Logger {
        self.ensure_worker();
        Logger::new(Arc::clone(&self.shared), category.into())
    }

    /// Hand a finished message to the worker. Fire-and-forget.
    ///
    /// Returns `false` if the message was dropped (provider disposed or worker gone).
    pub fn push_message(&self, message: LogMessage) -> bool {
        self.ensure_worker();
        self.shared.push(Box::new(message))
    }

    pub fn metrics(&self) -> &ProviderMetrics {
        &self.shared.metrics
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_worker(&self) {
        if self.started.load(Ordering::Acquire) {
            return;
        }
        let mut worker = self.worker.lock();
        if self.started.load(Ordering::Acquire) || self.is_disposed() {
            return;
        }

        let (sender, receiver) = unbounded();
        let (cancel, cancelled) = crossbeam_channel::bounded::<()>(0);
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.shared);
        let batch_size = self.options.batch_size.max(1);
        let window = self.options.batch_window;

        let spawned = thread::Builder::new()
            .name("sink-logging-worker".to_string())
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    run_worker(&receiver, &cancelled, sink.as_ref(), &shared, batch_size, window)
                }));
                if let Err(panic_info) = outcome {
                    eprintln!(
                        "[LOGGER CRITICAL] Worker terminated: {}. Later messages will be dropped.",
                        panic_message(panic_info.as_ref())
                    );
                }
                // the receiver drops here; later sends fail and are counted as dropped
            });

        match spawned {
            Ok(thread) => {
                *self.shared.sender.write() = Some(sender);
                *worker = Some(Worker { thread, cancel });
                // a shutdown that raced past the check above may have found no sender
                // to complete; take it back so the worker can drain and exit
                if self.is_disposed() {
                    drop(self.shared.sender.write().take());
                }
            }
            Err(e) => {
                eprintln!("[LOGGER ERROR] Failed to start worker thread: {}", e);
            }
        }
        self.started.store(true, Ordering::Release);
    }

    /// Complete the queue, wait up to `timeout` for the worker to drain it, cancel the
    /// worker and dispose the sink.
    ///
    /// Only the first call does the work; later calls return `true` immediately.
    /// Returns `false` if the worker did not finish in time or the sink failed to
    /// dispose.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return true;
        }

        // Loggers never hold a sender clone, so this completes the channel.
        drop(self.shared.sender.write().take());

        let mut clean = true;
        if let Some(worker) = self.worker.lock().take() {
            clean = wait_for_worker(worker.thread, timeout);
            drop(worker.cancel);
        }

        if let Err(e) = self.sink.dispose() {
            eprintln!("[LOGGER ERROR] Failed to dispose sink {}: {}", self.sink.name(), e);
            clean = false;
        }

        let metrics = &self.shared.metrics;
        let lost = metrics.dropped() + metrics.failed();
        if lost > 0 {
            eprintln!(
                "[LOGGER WARNING] Provider shutting down with {} lost messages (drop rate: {:.2}%)",
                lost,
                metrics.drop_rate()
            );
        }
        clean
    }

    /// [`shutdown`](Self::shutdown) with the configured timeout.
    pub fn dispose(&self) -> bool {
        self.shutdown(self.options.shutdown_timeout)
    }
}

impl Drop for LoggerProvider {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for LoggerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerProvider")
            .field("sink", &self.sink.name())
            .field("options", &self.options)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn wait_for_worker(handle: thread::JoinHandle<()>, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if handle.is_finished() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[LOGGER ERROR] Worker thread panicked during shutdown: {}",
                    panic_message(e.as_ref())
                );
                return false;
            }
            return true;
        }

        if start.elapsed() >= timeout {
            eprintln!(
                "[LOGGER WARNING] Worker thread did not finish within {:?} timeout. \
                 Some logs may be lost.",
                timeout
            );
            return false;
        }

        thread::sleep(Duration::from_millis(10));
    }
}

/// How a batch drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// Batch cap reached
    Filled,
    /// Window elapsed; the queue is still open
    TimedOut,
    /// Queue completed and empty
    Completed,
    /// Provider cancelled the worker
    Cancelled,
}

impl DrainOutcome {
    fn is_final(self) -> bool {
        matches!(self, DrainOutcome::Completed | DrainOutcome::Cancelled)
    }
}

/// Collect more messages into `batch` until it holds `cap` items or `window` elapses.
///
/// A timeout is a normal end of the drain and is reported separately from
/// cancellation.
pub(crate) fn read_all_available_within<T>(
    receiver: &Receiver<T>,
    cancel: &Receiver<()>,
    batch: &mut Vec<T>,
    cap: usize,
    window: Duration,
) -> DrainOutcome {
    let deadline = Instant::now() + window;
    while batch.len() < cap {
        // take whatever is already queued before waiting
        if let Ok(item) = receiver.try_recv() {
            batch.push(item);
            continue;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return DrainOutcome::TimedOut;
        }
        let step = select! {
            recv(receiver) -> item => match item {
                Ok(item) => {
                    batch.push(item);
                    None
                }
                Err(_) => Some(DrainOutcome::Completed),
            },
            recv(cancel) -> _ => Some(DrainOutcome::Cancelled),
            default(remaining) => Some(DrainOutcome::TimedOut),
        };
        if let Some(outcome) = step {
            return outcome;
        }
    }
    DrainOutcome::Filled
}

fn run_worker(
    receiver: &Receiver<Box<LogMessage>>,
    cancel: &Receiver<()>,
    sink: &dyn Sink,
    shared: &ProviderShared,
    batch_size: usize,
    window: Duration,
) {
    let mut batch: Vec<Box<LogMessage>> = Vec::with_capacity(batch_size);
    loop {
        let first = select! {
            recv(receiver) -> item => item.ok(),
            recv(cancel) -> _ => None,
        };
        match first {
            Some(message) => batch.push(message),
            None => break,
        }

        let outcome = match sink.as_bulk() {
            Some(bulk) => {
                let outcome =
                    read_all_available_within(receiver, cancel, &mut batch, batch_size, window);
                deliver_batch(bulk, &batch, &shared.metrics);
                outcome
            }
            None => {
                deliver_one(sink, &batch[0], &shared.metrics);
                DrainOutcome::Filled
            }
        };

        for message in batch.drain(..) {
            shared.recycle(message);
        }

        if outcome.is_final() {
            break;
        }
    }
}

fn deliver_one(sink: &dyn Sink, message: &LogMessage, metrics: &ProviderMetrics) {
    let result = catch_unwind(AssertUnwindSafe(|| sink.log(message)));
    report(sink, result, 1, metrics);
}

fn deliver_batch(sink: &dyn BulkSink, batch: &[Box<LogMessage>], metrics: &ProviderMetrics) {
    let mut delivered = 0u64;
    let result = catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        let mut queue = sink.create_queue();
        let mut enqueued = 0u64;
        for message in batch {
            if let Err(e) = queue.enqueue(message) {
                // what the queue already accepted still goes out
                if queue.dispose().is_ok() {
                    delivered = enqueued;
                }
                return Err(e);
            }
            enqueued += 1;
        }
        queue.flush()?;
        queue.dispose()
    }));
    metrics.record_batch();
    if delivered > 0 {
        metrics.record_delivered(delivered);
    }
    report(sink, result, batch.len() as u64 - delivered, metrics);
}

fn report<S: Sink + ?Sized>(
    sink: &S,
    result: std::thread::Result<Result<()>>,
    count: u64,
    metrics: &ProviderMetrics,
) {
    match result {
        Ok(Ok(())) => {
            metrics.record_delivered(count);
        }
        Ok(Err(e)) => {
            eprintln!(
                "[LOGGER ERROR] Sink {} failed, {} message(s) dropped: {}",
                sink.name(),
                count,
                e
            );
            metrics.record_failed(count);
        }
        Err(panic_info) => {
            eprintln!(
                "[LOGGER CRITICAL] Sink {} panicked: {}. {} message(s) dropped, worker continues.",
                sink.name(),
                panic_message(panic_info.as_ref()),
                count
            );
            metrics.record_failed(count);
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builder for constructing a [`LoggerProvider`] with a fluent API
///
/// # Example
/// ```no_run
/// use rust_sink_logging::prelude::*;
/// use std::time::Duration;
///
/// let provider = LoggerProvider::builder()
///     .min_level(LogLevel::Info)
///     .batch_size(50)
///     .batch_window(Duration::from_millis(100))
///     .build(FormattedSink::from_uri("stderr").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct LoggerProviderBuilder {
    options: ProviderOptions,
}

impl LoggerProviderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.options.min_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn batch_window(mut self, window: Duration) -> Self {
        self.options.batch_window = window;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.options.shutdown_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn message_pool_capacity(mut self, capacity: usize) -> Self {
        self.options.message_pool_capacity = capacity;
        self
    }

    /// Capture a request context from `source` for every message.
    #[must_use = "builder methods return a new value"]
    pub fn context_source<C: WebContextSource + 'static>(mut self, source: C) -> Self {
        self.options.context_source = Some(Arc::new(source));
        self
    }

    #[must_use]
    pub fn options(self) -> ProviderOptions {
        self.options
    }

    pub fn build<S: Sink + 'static>(self, sink: S) -> LoggerProvider {
        LoggerProvider::with_options(Arc::new(sink), self.options)
    }

    pub fn build_shared(self, sink: Arc<dyn Sink>) -> LoggerProvider {
        LoggerProvider::with_options(sink, self.options)
    }
}
