//! Human-readable line sink
//!
//! `2025.01.08 10:30:45.123 [category] message`, with the error chain indented on
//! the following line.

use super::generic::{BulkPayloadWriter, GenericSink, PayloadFactory, PayloadWriter};
use crate::core::{LogMessage, Result, TimestampFormat};
use crate::outputs::{create_output, ByteSequenceOutput};
use std::fmt;

/// Renders one line per message.
#[derive(Debug, Clone, Default)]
pub struct FormattedPayloadFactory {
    timestamp_format: TimestampFormat,
}

impl FormattedPayloadFactory {
    pub fn new(timestamp_format: TimestampFormat) -> Self {
        Self { timestamp_format }
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }
}

impl PayloadFactory for FormattedPayloadFactory {
    type Payload = String;

    fn create_payload(&self, message: &LogMessage) -> String {
        let mut timestamp = String::with_capacity(32);
        self.timestamp_format
            .write_to(&mut timestamp, &message.timestamp());
        let error = message.error_text();

        let mut len =
            timestamp.len() + 2 + message.category().len() + 2 + message.message().len() + 1;
        if let Some(error) = &error {
            len += 2 + error.len() + 1;
        }

        let mut line = String::with_capacity(len);
        line.push_str(&timestamp);
        line.push_str(" [");
        line.push_str(message.category());
        line.push_str("] ");
        line.push_str(message.message());
        line.push('\n');
        if let Some(error) = &error {
            line.push_str("  ");
            line.push_str(error);
            line.push('\n');
        }
        line
    }
}

/// Writes byte payloads to a [`ByteSequenceOutput`].
pub struct ByteOutputWriter {
    output: Box<dyn ByteSequenceOutput>,
}

impl ByteOutputWriter {
    pub fn new(output: Box<dyn ByteSequenceOutput>) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &dyn ByteSequenceOutput {
        self.output.as_ref()
    }
}

impl fmt::Debug for ByteOutputWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteOutputWriter")
            .field("output", &self.output.name())
            .finish()
    }
}

impl<P: AsRef<[u8]>> PayloadWriter<P> for ByteOutputWriter {
    fn write_payload(&self, payload: P) -> Result<()> {
        self.output.write(payload.as_ref())?;
        self.output.flush()
    }

    fn dispose(&self) -> Result<()> {
        self.output.dispose()
    }
}

impl<P: AsRef<[u8]>> BulkPayloadWriter<P> for ByteOutputWriter {
    fn write_payloads(&self, payloads: Vec<P>) -> Result<()> {
        for payload in &payloads {
            self.output.write(payload.as_ref())?;
        }
        self.output.flush()
    }
}

/// Simple sink writing formatted lines.
///
/// # Example
/// ```
/// use rust_sink_logging::prelude::*;
///
/// let sink = FormattedSink::from_uri("stderr").unwrap();
/// assert_eq!(sink.name(), "FormattedSink");
/// ```
pub type FormattedSink = GenericSink<FormattedPayloadFactory, ByteOutputWriter>;

impl GenericSink<FormattedPayloadFactory, ByteOutputWriter> {
    /// Sink writing to the output named by `uri_or_name`.
    ///
    /// # Errors
    ///
    /// Fails at setup time for an invalid or unsupported output URI.
    pub fn from_uri(uri_or_name: &str) -> Result<Self> {
        Ok(Self::with_output(create_output(uri_or_name)?))
    }

    pub fn with_output(output: Box<dyn ByteSequenceOutput>) -> Self {
        Self::with_output_and_format(output, TimestampFormat::default())
    }

    pub fn with_output_and_format(
        output: Box<dyn ByteSequenceOutput>,
        timestamp_format: TimestampFormat,
    ) -> Self {
        GenericSink::new(
            FormattedPayloadFactory::new(timestamp_format),
            ByteOutputWriter::new(output),
        )
        .named("FormattedSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventId, LogLevel, LoggerError, Sink};
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct MemoryOutput {
        bytes: Mutex<Vec<u8>>,
    }

    impl ByteSequenceOutput for MemoryOutput {
        fn write(&self, data: &[u8]) -> Result<()> {
            self.bytes.lock().extend_from_slice(data);
            Ok(())
        }

        fn dispose(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    fn at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()
    }

    #[test]
    fn test_line_layout() {
        let factory = FormattedPayloadFactory::new(TimestampFormat::Iso8601);
        let message = LogMessage::new("svc", LogLevel::Info, EventId::default(), None, "hello")
            .with_timestamp(at());
        assert_eq!(
            factory.create_payload(&message),
            "2025-01-08T10:30:45.000Z [svc] hello\n"
        );
    }

    #[test]
    fn test_error_line_is_indented() {
        let factory = FormattedPayloadFactory::new(TimestampFormat::UnixMillis);
        let message = LogMessage::new(
            "io",
            LogLevel::Error,
            EventId::default(),
            Some(Arc::new(DiskFull)),
            "write failed",
        )
        .with_timestamp(at());
        let line = factory.create_payload(&message);
        assert_eq!(line, "1736332245000 [io] write failed\n  disk full\n");
    }

    #[test]
    fn test_sink_writes_to_output() {
        let output = Arc::new(MemoryOutput::default());
        let sink = FormattedSink::with_output_and_format(
            Box::new(Arc::clone(&output)),
            TimestampFormat::Iso8601,
        );
        let message = LogMessage::new("a", LogLevel::Warning, EventId::default(), None, "one")
            .with_timestamp(at());
        sink.log(&message).unwrap();
        assert_eq!(
            String::from_utf8(output.bytes.lock().clone()).unwrap(),
            "2025-01-08T10:30:45.000Z [a] one\n"
        );
    }

    #[test]
    fn test_bulk_writer_flushes_once() {
        let output = Arc::new(MemoryOutput::default());
        let writer = ByteOutputWriter::new(Box::new(Arc::clone(&output)));
        writer
            .write_payloads(vec!["a\n".to_string(), "b\n".to_string()])
            .unwrap();
        assert_eq!(output.bytes.lock().as_slice(), b"a\nb\n");
    }

    #[test]
    fn test_from_uri_rejects_unknown_scheme() {
        assert!(matches!(
            FormattedSink::from_uri("ftp://host/x"),
            Err(LoggerError::UnsupportedOutput { .. })
        ));
    }
}
