//! Line-oriented collector sink
//!
//! Each message becomes one JSON [`LogEntry`] terminated by `\n`, the format a
//! fluentd-style agent tails from stdout, a file or a TCP socket. Entries are
//! recycled through a small pool.

use super::config::{CategoryHandling, SinkConfig, TraceHandling};
use super::generic::{GenericSink, PayloadFactory, PayloadWriter};
use super::labels::{fill_labels, LabelProvider};
use super::text::TextPayload;
use crate::core::{FixSizePool, LogMessage, Result, WebContext};
use crate::outputs::{create_output, ByteSequenceOutput};
use crate::payload::{severity_of, ErrorContext, HttpRequest, LogEntry, ServiceContext};
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Entries kept for reuse by one factory.
pub const ENTRY_POOL_CAPACITY: usize = 8;

/// Status reported for errors logged outside a finished response.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Pooled entry. Dropping it clears the entry and hands it back.
pub struct PooledEntry {
    entry: Option<Box<LogEntry>>,
    pool: Arc<FixSizePool<LogEntry>>,
}

impl Deref for PooledEntry {
    type Target = LogEntry;

    fn deref(&self) -> &LogEntry {
        match &self.entry {
            Some(entry) => entry,
            // emptied only in `drop`
            None => unreachable!("pooled entry used after release"),
        }
    }
}

impl Drop for PooledEntry {
    fn drop(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            entry.clear();
            self.pool.give_back(entry);
        }
    }
}

impl fmt::Debug for PooledEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Builds collector entries.
pub struct FluentdPayloadFactory {
    config: SinkConfig,
    log_name: String,
    label_providers: Vec<Arc<dyn LabelProvider>>,
    pool: Arc<FixSizePool<LogEntry>>,
}

impl FluentdPayloadFactory {
    pub fn new(config: SinkConfig, label_providers: Vec<Arc<dyn LabelProvider>>) -> Self {
        Self {
            log_name: config.log_name(),
            config,
            label_providers,
            pool: Arc::new(FixSizePool::new(ENTRY_POOL_CAPACITY)),
        }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Entries currently waiting in the pool.
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    fn fill(&self, entry: &mut LogEntry, message: &LogMessage, context: &WebContext) {
        entry.log_name.push_str(&self.log_name);
        entry.severity = severity_of(message.level());
        entry.timestamp = message.timestamp();

        let error = message.error_text();
        TextPayload::for_message(
            message,
            error.as_deref(),
            self.config.event_id_handling,
            self.config.category_handling,
        )
        .render_into(&mut entry.message);

        if message.is_request_summary() {
            entry.http_request = Some(HttpRequest {
                request_method: context.method.clone().unwrap_or_default(),
                request_url: context.url.clone().unwrap_or_default(),
                status: context.response_status_code.unwrap_or_default(),
                response_size: context.response_content_length,
                user_agent: context.user_agent.clone().unwrap_or_default(),
                remote_ip: context.remote_ip.clone().unwrap_or_default(),
                referer: context.referrer.clone().unwrap_or_default(),
                latency: context.latency,
            });
        }
        if message.error().is_some() {
            entry.context = Some(ErrorContext {
                method: context.method.clone().unwrap_or_default(),
                url: context.url.clone().unwrap_or_default(),
                user_agent: context.user_agent.clone().unwrap_or_default(),
                referer: context.referrer.clone().unwrap_or_default(),
                response_status_code: context
                    .response_status_code
                    .unwrap_or(DEFAULT_ERROR_STATUS),
                remote_ip: context.remote_ip.clone().unwrap_or_default(),
                user: context.user.clone().unwrap_or_default(),
            });
            entry.service_context = Some(ServiceContext {
                service: self.config.service.clone(),
                version: self.config.service_version.clone(),
            });
        }
        entry.trace = match self.config.trace_handling {
            TraceHandling::Enabled => context.trace_id.clone(),
            TraceHandling::Summary if entry.http_request.is_some() => context.trace_id.clone(),
            _ => None,
        };

        fill_labels(
            &mut entry.labels,
            self.config.category_handling == CategoryHandling::IncludeAsLabel,
            &self.label_providers,
            message.category(),
            message.event_id(),
            message.level(),
            context,
        );
    }
}

impl PayloadFactory for FluentdPayloadFactory {
    type Payload = PooledEntry;

    fn create_payload(&self, message: &LogMessage) -> PooledEntry {
        let mut entry = self.pool.rent_or_else(LogEntry::default);
        match message.web_context() {
            Some(context) => self.fill(&mut entry, message, context),
            None => self.fill(&mut entry, message, &WebContext::default()),
        }
        PooledEntry {
            entry: Some(entry),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl fmt::Debug for FluentdPayloadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluentdPayloadFactory")
            .field("log_name", &self.log_name)
            .field("label_providers", &self.label_providers.len())
            .field("pool", &self.pool)
            .finish()
    }
}

/// Serializes one entry per line and flushes after each.
pub struct FluentdPayloadWriter {
    output: Box<dyn ByteSequenceOutput>,
    buffer: Mutex<Vec<u8>>,
}

impl FluentdPayloadWriter {
    pub fn new(output: Box<dyn ByteSequenceOutput>) -> Self {
        Self {
            output,
            buffer: Mutex::new(Vec::with_capacity(1024)),
        }
    }
}

impl PayloadWriter<PooledEntry> for FluentdPayloadWriter {
    fn write_payload(&self, payload: PooledEntry) -> Result<()> {
        let mut buffer = self.buffer.lock();
        buffer.clear();
        serde_json::to_writer(&mut *buffer, &*payload)?;
        // entry goes back to the pool before the output is touched
        drop(payload);
        buffer.push(b'\n');
        self.output.write(&buffer)?;
        self.output.flush()
    }

    fn dispose(&self) -> Result<()> {
        self.output.dispose()
    }
}

impl fmt::Debug for FluentdPayloadWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluentdPayloadWriter")
            .field("output", &self.output.name())
            .finish()
    }
}

pub type FluentdSink = GenericSink<FluentdPayloadFactory, FluentdPayloadWriter>;

impl GenericSink<FluentdPayloadFactory, FluentdPayloadWriter> {
    /// Validate `config` and open its output.
    ///
    /// # Errors
    ///
    /// Configuration problems surface here, never on the first write.
    pub fn from_config(
        config: SinkConfig,
        label_providers: Vec<Arc<dyn LabelProvider>>,
    ) -> Result<Self> {
        config.validate()?;
        let output = create_output(&config.output)?;
        Ok(Self::with_output(config, label_providers, output))
    }

    pub fn with_output(
        config: SinkConfig,
        label_providers: Vec<Arc<dyn LabelProvider>>,
        output: Box<dyn ByteSequenceOutput>,
    ) -> Self {
        GenericSink::new(
            FluentdPayloadFactory::new(config, label_providers),
            FluentdPayloadWriter::new(output),
        )
        .named("FluentdSink")
    }
}
