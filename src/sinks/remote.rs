//! Remote structured-logging API sink
//!
//! Entries are batched by the provider worker and submitted through a
//! [`LoggingClient`] in one call per batch. The client is async; the writer owns a
//! current-thread runtime and drives each call to completion on the worker thread.

use super::config::{CategoryHandling, SinkConfig, TraceHandling};
use super::generic::{BulkPayloadWriter, GenericBulkSink, PayloadFactory, PayloadWriter};
use super::labels::{fill_labels, LabelProvider};
use super::text::TextPayload;
use crate::core::{find_rpc_error, LogMessage, LoggerError, Result, WebContext};
use crate::payload::{converters, severity_of, HttpRequest, LogSeverity};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Error returned by a [`LoggingClient`]. An [`RpcError`](crate::core::RpcError)
/// anywhere in its source chain marks a transport failure.
pub type ClientError = Box<dyn Error + Send + Sync + 'static>;

/// Resource the entries are attributed to, e.g. `{"type": "global"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl MonitoredResource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            labels: HashMap::new(),
        }
    }

    pub fn global() -> Self {
        Self::new("global")
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Entry body: plain text, or a structured error report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemotePayload {
    TextPayload(String),
    JsonPayload(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLogEntry {
    pub log_name: String,
    pub resource: MonitoredResource,
    pub severity: LogSeverity,
    #[serde(with = "converters::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequest>,
    #[serde(flatten)]
    pub payload: RemotePayload,
}

impl RemoteLogEntry {
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            RemotePayload::TextPayload(text) => Some(text),
            RemotePayload::JsonPayload(_) => None,
        }
    }
}

/// Client of the remote logging API.
#[async_trait]
pub trait LoggingClient: Send + Sync {
    /// Submit `entries` in order as a single request.
    async fn write_log_entries(
        &self,
        log_name: &str,
        resource: &MonitoredResource,
        labels: Option<&HashMap<String, String>>,
        entries: Vec<RemoteLogEntry>,
    ) -> std::result::Result<(), ClientError>;
}

pub struct RemotePayloadFactory {
    config: SinkConfig,
    log_name: String,
    resource: MonitoredResource,
    label_providers: Vec<Arc<dyn LabelProvider>>,
}

impl RemotePayloadFactory {
    pub fn new(
        config: SinkConfig,
        resource: MonitoredResource,
        label_providers: Vec<Arc<dyn LabelProvider>>,
    ) -> Self {
        Self {
            log_name: config.log_name(),
            config,
            resource,
            label_providers,
        }
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    pub fn resource(&self) -> &MonitoredResource {
        &self.resource
    }

    fn http_request(context: &WebContext) -> Option<HttpRequest> {
        let url = context.url.as_deref().filter(|url| !url.is_empty())?;
        Some(HttpRequest {
            request_method: context.method.clone().unwrap_or_default(),
            request_url: url.to_string(),
            status: context.response_status_code.unwrap_or_default(),
            response_size: context.response_content_length,
            user_agent: context.user_agent.clone().unwrap_or_default(),
            remote_ip: context.remote_ip.clone().unwrap_or_default(),
            referer: context.referrer.clone().unwrap_or_default(),
            latency: context.latency,
        })
    }

    /// `{eventTime, serviceContext, message, context}` error report.
    fn error_report(&self, timestamp: DateTime<Utc>, message: String, ctx: &WebContext) -> Value {
        let mut service = Map::new();
        service.insert("service".into(), Value::from(self.config.service.as_str()));
        insert_text(&mut service, "version", self.config.service_version.as_deref());

        let mut context = Map::new();
        insert_text(&mut context, "method", ctx.method.as_deref());
        insert_text(&mut context, "url", ctx.url.as_deref());
        insert_text(&mut context, "userAgent", ctx.user_agent.as_deref());
        insert_text(&mut context, "referer", ctx.referrer.as_deref());
        context.insert(
            "responseStatusCode".into(),
            Value::from(ctx.response_status_code.unwrap_or_default()),
        );
        insert_text(&mut context, "remoteIp", ctx.remote_ip.as_deref());
        insert_text(&mut context, "user", ctx.user.as_deref());

        let mut report = Map::new();
        report.insert(
            "eventTime".into(),
            Value::from(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        report.insert("serviceContext".into(), Value::Object(service));
        report.insert("message".into(), Value::from(message));
        report.insert("context".into(), Value::Object(context));
        Value::Object(report)
    }

    fn entry(&self, message: &LogMessage, context: &WebContext) -> RemoteLogEntry {
        let mut labels = HashMap::new();
        fill_labels(
            &mut labels,
            self.config.category_handling == CategoryHandling::IncludeAsLabel,
            &self.label_providers,
            message.category(),
            message.event_id(),
            message.level(),
            context,
        );

        let http_request = if message.is_request_summary() {
            Self::http_request(context)
        } else {
            None
        };
        let trace = match self.config.trace_handling {
            TraceHandling::Enabled => context.trace_id.as_deref(),
            TraceHandling::Summary if http_request.is_some() => context.trace_id.as_deref(),
            _ => None,
        }
        .map(|id| self.config.trace_name(id));

        let error = message.error_text();
        let text = TextPayload::for_message(
            message,
            error.as_deref(),
            self.config.event_id_handling,
            self.config.category_handling,
        )
        .render();
        let payload = if message.error().is_some() {
            RemotePayload::JsonPayload(self.error_report(message.timestamp(), text, context))
        } else {
            RemotePayload::TextPayload(text)
        };

        RemoteLogEntry {
            log_name: self.log_name.clone(),
            resource: self.resource.clone(),
            severity: severity_of(message.level()),
            timestamp: message.timestamp(),
            labels,
            trace,
            http_request,
            payload,
        }
    }
}

fn insert_text(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        map.insert(key.to_string(), Value::from(value));
    }
}

impl PayloadFactory for RemotePayloadFactory {
    type Payload = RemoteLogEntry;

    fn create_payload(&self, message: &LogMessage) -> RemoteLogEntry {
        match message.web_context() {
            Some(context) => self.entry(message, context),
            None => self.entry(message, &WebContext::default()),
        }
    }
}

impl fmt::Debug for RemotePayloadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePayloadFactory")
            .field("log_name", &self.log_name)
            .field("resource", &self.resource)
            .field("label_providers", &self.label_providers.len())
            .finish()
    }
}

/// Bulk writer submitting batches through a [`LoggingClient`].
///
/// Must not be driven from inside another tokio runtime; the provider worker is a
/// plain thread.
pub struct RemotePayloadWriter {
    client: Arc<dyn LoggingClient>,
    runtime: Runtime,
    log_name: String,
    resource: MonitoredResource,
    disposed: AtomicBool,
}

impl RemotePayloadWriter {
    /// # Errors
    ///
    /// Fails when the runtime driving the client cannot be created.
    pub fn new(
        client: Arc<dyn LoggingClient>,
        log_name: impl Into<String>,
        resource: MonitoredResource,
    ) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| {
                LoggerError::io_operation("start remote client runtime", "runtime build failed", e)
            })?;
        Ok(Self {
            client,
            runtime,
            log_name: log_name.into(),
            resource,
            disposed: AtomicBool::new(false),
        })
    }

    fn submit(&self, entries: Vec<RemoteLogEntry>) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::disposed("RemotePayloadWriter"));
        }
        let call = self
            .client
            .write_log_entries(&self.log_name, &self.resource, None, entries);
        match self.runtime.block_on(call) {
            Ok(()) => Ok(()),
            Err(e) => match find_rpc_error(&*e) {
                Some(rpc) => {
                    eprintln!("[LOGGER ERROR] Unable to write log entries: {}.", rpc);
                    Ok(())
                }
                None => Err(LoggerError::remote(e.to_string())),
            },
        }
    }
}

impl PayloadWriter<RemoteLogEntry> for RemotePayloadWriter {
    fn write_payload(&self, payload: RemoteLogEntry) -> Result<()> {
        self.submit(vec![payload])
    }

    fn dispose(&self) -> Result<()> {
        self.disposed.store(true, Ordering::Release);
        Ok(())
    }
}

impl BulkPayloadWriter<RemoteLogEntry> for RemotePayloadWriter {
    fn write_payloads(&self, payloads: Vec<RemoteLogEntry>) -> Result<()> {
        self.submit(payloads)
    }
}

impl fmt::Debug for RemotePayloadWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePayloadWriter")
            .field("log_name", &self.log_name)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

pub type RemoteSink = GenericBulkSink<RemotePayloadFactory, RemotePayloadWriter>;

impl GenericBulkSink<RemotePayloadFactory, RemotePayloadWriter> {
    /// # Errors
    ///
    /// Rejects an invalid `config` at setup time.
    pub fn from_config(
        config: SinkConfig,
        resource: MonitoredResource,
        client: Arc<dyn LoggingClient>,
        label_providers: Vec<Arc<dyn LabelProvider>>,
    ) -> Result<Self> {
        config.validate()?;
        let writer = RemotePayloadWriter::new(client, config.log_name(), resource.clone())?;
        let factory = RemotePayloadFactory::new(config, resource, label_providers);
        Ok(GenericBulkSink::new(factory, writer).named("RemoteSink"))
    }
}
