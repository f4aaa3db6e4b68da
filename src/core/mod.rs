//! Core pipeline types: messages, loggers, the provider worker and sink traits

pub mod error;
pub mod event_id;
pub mod log_level;
pub mod log_message;
pub mod logger;
pub mod metrics;
pub mod pool;
pub mod provider;
pub mod scope;
pub mod sink;
pub mod timestamp;
pub mod web_context;

pub use error::{find_rpc_error, LoggerError, Result, RpcError};
pub use event_id::EventId;
pub use log_level::LogLevel;
pub use log_message::{render_error_chain, LogMessage, SharedError, WebScope};
pub use logger::{Logger, ScopeValue};
pub use metrics::ProviderMetrics;
pub use pool::{FixSizePool, MAX_POOL_CAPACITY};
pub use provider::{
    LoggerProvider, LoggerProviderBuilder, ProviderOptions, DEFAULT_BATCH_SIZE,
    DEFAULT_BATCH_WINDOW, DEFAULT_MESSAGE_POOL_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use scope::{ScopeGuard, ScopeStack};
pub use sink::{BulkSink, Sink, SinkQueue};
pub use timestamp::TimestampFormat;
pub use web_context::{Headers, RequestSummary, WebContext, WebContextSource};
