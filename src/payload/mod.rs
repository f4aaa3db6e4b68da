//! Transport records and their wire encodings

pub mod converters;
pub mod entry;
pub mod severity;

pub use entry::{ErrorContext, HttpRequest, LogEntry, ServiceContext, LABELS_KEY, TRACE_KEY};
pub use severity::{severity_of, LogSeverity};
