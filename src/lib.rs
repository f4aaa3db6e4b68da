//! # Rust Sink Logging
//!
//! A structured-logging pipeline: loggers hand messages to a provider, a single
//! worker thread batches them and delivers each batch to a sink, and sinks turn
//! messages into payloads written to byte outputs or a remote logging service.
//!
//! ## Features
//!
//! - **Non-blocking callers**: logging only formats the text and enqueues it
//! - **Batched delivery**: bulk sinks receive a whole batch through one queue
//! - **Structured payloads**: fluentd JSON lines and remote log entries
//! - **Rolling files**: date and size triggers with gzip compression of rolled files
//!
//! ## Example
//!
//! ```
//! use rust_sink_logging::prelude::*;
//! use std::time::Duration;
//!
//! let provider = LoggerProvider::new(FormattedSink::from_uri("stderr").unwrap());
//! let logger = provider.create_logger("startup");
//! logger.info("service ready");
//! assert!(provider.shutdown(Duration::from_secs(5)));
//! ```

pub mod core;
pub mod macros;
pub mod outputs;
pub mod payload;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        BulkSink, EventId, LogLevel, LogMessage, Logger, LoggerError, LoggerProvider,
        LoggerProviderBuilder, ProviderMetrics, ProviderOptions, RequestSummary, Result, Sink,
        SinkQueue, TimestampFormat, WebContext, WebContextSource,
    };
    pub use crate::outputs::{create_output, ByteSequenceOutput};
    pub use crate::sinks::{
        CategoryHandling, EventIdHandling, FluentdSink, FormattedSink, SinkConfig,
        TraceHandling,
    };
    #[cfg(feature = "remote")]
    pub use crate::sinks::{LoggingClient, MonitoredResource, RemoteSink};
}

pub use core::{
    BulkSink, EventId, LogLevel, LogMessage, Logger, LoggerError, LoggerProvider,
    LoggerProviderBuilder, ProviderMetrics, ProviderOptions, RequestSummary, Result, Sink,
    SinkQueue, TimestampFormat, WebContext, WebContextSource, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sinks::{FluentdSink, FormattedSink, SinkConfig};
