//! Sinks built from payload factories and writers

pub mod config;
pub mod fluentd;
pub mod formatted;
pub mod generic;
pub mod labels;
#[cfg(feature = "remote")]
pub mod remote;
pub mod text;

pub use config::{CategoryHandling, EventIdHandling, SinkConfig, TraceHandling};
pub use fluentd::{FluentdPayloadFactory, FluentdPayloadWriter, FluentdSink, PooledEntry};
pub use formatted::{ByteOutputWriter, FormattedPayloadFactory, FormattedSink};
pub use generic::{
    BulkPayloadWriter, GenericBulkSink, GenericSink, GenericSinkQueue, PayloadFactory,
    PayloadWriter,
};
pub use labels::{LabelProvider, LabelProviders};
#[cfg(feature = "remote")]
pub use remote::{
    ClientError, LoggingClient, MonitoredResource, RemoteLogEntry, RemotePayload,
    RemotePayloadFactory, RemotePayloadWriter, RemoteSink,
};
pub use text::TextPayload;
