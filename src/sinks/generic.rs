//! Sinks composed from a payload factory and a payload writer
//!
//! The factory turns a [`LogMessage`] into a transport payload; the writer delivers
//! one payload, or a batch of them for bulk writers. The same factory can therefore
//! serve a line-per-entry output and a batched remote API.

use crate::core::{BulkSink, LogMessage, LoggerError, Result, Sink, SinkQueue};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

/// Converts a message into a transport payload.
pub trait PayloadFactory: Send + Sync {
    type Payload: Send;

    fn create_payload(&self, message: &LogMessage) -> Self::Payload;

    fn dispose(&self) -> Result<()> {
        Ok(())
    }
}

/// Delivers payloads one at a time.
pub trait PayloadWriter<P>: Send + Sync {
    fn write_payload(&self, payload: P) -> Result<()>;

    /// Release the writer's output. Idempotent.
    fn dispose(&self) -> Result<()>;
}

/// Writer able to deliver a whole batch in one call.
pub trait BulkPayloadWriter<P>: PayloadWriter<P> {
    /// Deliver `payloads` in order.
    fn write_payloads(&self, payloads: Vec<P>) -> Result<()>;
}

/// Dispose writer then factory, keeping the first error.
fn dispose_parts<F: PayloadFactory, W: PayloadWriter<F::Payload>>(
    factory: &F,
    writer: &W,
) -> Result<()> {
    let written = writer.dispose();
    let created = factory.dispose();
    written.and(created)
}

/// Simple sink: each message is turned into a payload and written immediately.
#[derive(Debug)]
pub struct GenericSink<F, W> {
    factory: F,
    writer: W,
    name: Cow<'static, str>,
    disposed: AtomicBool,
}

impl<F, W> GenericSink<F, W>
where
    F: PayloadFactory,
    W: PayloadWriter<F::Payload>,
{
    pub fn new(factory: F, writer: W) -> Self {
        Self {
            factory,
            writer,
            name: Cow::Borrowed("GenericSink"),
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<F, W> Sink for GenericSink<F, W>
where
    F: PayloadFactory,
    W: PayloadWriter<F::Payload>,
{
    fn log(&self, message: &LogMessage) -> Result<()> {
        if self.is_disposed() {
            return Err(LoggerError::disposed(self.name.as_ref()));
        }
        let payload = self.factory.create_payload(message);
        self.writer.write_payload(payload)
    }

    fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        dispose_parts(&self.factory, &self.writer)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Bulk sink: the worker batches messages through a [`GenericSinkQueue`].
#[derive(Debug)]
pub struct GenericBulkSink<F, W> {
    factory: F,
    writer: W,
    name: Cow<'static, str>,
    disposed: AtomicBool,
}

impl<F, W> GenericBulkSink<F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    pub fn new(factory: F, writer: W) -> Self {
        Self {
            factory,
            writer,
            name: Cow::Borrowed("GenericBulkSink"),
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Typed queue; [`BulkSink::create_queue`] boxes the same thing.
    pub fn queue(&self) -> GenericSinkQueue<'_, F, W> {
        GenericSinkQueue {
            sink: self,
            payloads: Vec::new(),
            disposed: false,
        }
    }
}

impl<F, W> Sink for GenericBulkSink<F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    fn log(&self, message: &LogMessage) -> Result<()> {
        if self.is_disposed() {
            return Err(LoggerError::disposed(self.name.as_ref()));
        }
        let payload = self.factory.create_payload(message);
        self.writer.write_payload(payload)
    }

    fn as_bulk(&self) -> Option<&dyn BulkSink> {
        Some(self)
    }

    fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        dispose_parts(&self.factory, &self.writer)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F, W> BulkSink for GenericBulkSink<F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    fn create_queue(&self) -> Box<dyn SinkQueue + '_> {
        Box::new(self.queue())
    }
}

/// Payloads accumulated for one flush.
///
/// Dropping an undisposed queue flushes the remainder; a failure at that point
/// can only be reported on stderr.
pub struct GenericSinkQueue<'a, F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    sink: &'a GenericBulkSink<F, W>,
    payloads: Vec<F::Payload>,
    disposed: bool,
}

impl<F, W> GenericSinkQueue<'_, F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl<F, W> SinkQueue for GenericSinkQueue<'_, F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    fn enqueue(&mut self, message: &LogMessage) -> Result<()> {
        if self.disposed || self.sink.is_disposed() {
            return Err(LoggerError::disposed("GenericSinkQueue"));
        }
        self.payloads.push(self.sink.factory.create_payload(message));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.payloads.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.payloads);
        self.sink.writer.write_payloads(batch)
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.flush()
    }
}

impl<F, W> Drop for GenericSinkQueue<'_, F, W>
where
    F: PayloadFactory,
    W: BulkPayloadWriter<F::Payload>,
{
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            eprintln!(
                "[LOGGER ERROR] Sink {} failed to flush queue on drop: {}",
                self.sink.name(),
                e
            );
        }
    }
}
