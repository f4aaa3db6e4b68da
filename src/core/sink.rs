//! Sink traits consumed by the provider worker

use super::error::Result;
use super::log_message::LogMessage;

/// Delivery target for log messages.
///
/// A simple sink handles one message per call. A sink that can batch also
/// implements [`BulkSink`] and reports it through [`Sink::as_bulk`]; the worker
/// then groups drained messages into one [`SinkQueue`] per round.
pub trait Sink: Send + Sync {
    /// Deliver a single message.
    fn log(&self, message: &LogMessage) -> Result<()>;

    /// Bulk capability, if any.
    fn as_bulk(&self) -> Option<&dyn BulkSink> {
        None
    }

    /// Release the sink's resources. Calling it more than once has no effect.
    fn dispose(&self) -> Result<()>;

    fn name(&self) -> &str {
        "Sink"
    }
}

/// Sink able to batch messages into a single flush.
pub trait BulkSink: Sink {
    fn create_queue(&self) -> Box<dyn SinkQueue + '_>;
}

/// Per-round batch created by a [`BulkSink`].
///
/// `enqueue` only builds payloads; nothing is written until `flush` or
/// `dispose`. Dropping the queue disposes it.
pub trait SinkQueue {
    fn enqueue(&mut self, message: &LogMessage) -> Result<()>;

    /// Deliver every accumulated payload in one call, then clear them.
    fn flush(&mut self) -> Result<()>;

    /// Flush the remainder and reject further messages. Idempotent.
    fn dispose(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn log(&self, message: &LogMessage) -> Result<()> {
        (**self).log(message)
    }

    fn as_bulk(&self) -> Option<&dyn BulkSink> {
        (**self).as_bulk()
    }

    fn dispose(&self) -> Result<()> {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
