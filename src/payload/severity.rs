//! Transport severity scale

use crate::core::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity vocabulary of the structured-logging transport.
///
/// Serialized as the upper-case name (`"INFO"`, `"WARNING"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSeverity {
    #[default]
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogSeverity::Default => "DEFAULT",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Notice => "NOTICE",
            LogSeverity::Warning => "WARNING",
            LogSeverity::Error => "ERROR",
            LogSeverity::Critical => "CRITICAL",
            LogSeverity::Alert => "ALERT",
            LogSeverity::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for LogSeverity {
    fn from(level: LogLevel) -> Self {
        severity_of(level)
    }
}

/// Map a log level onto the transport scale. Trace folds into `Debug`.
#[inline]
pub const fn severity_of(level: LogLevel) -> LogSeverity {
    match level {
        LogLevel::Trace | LogLevel::Debug => LogSeverity::Debug,
        LogLevel::Info => LogSeverity::Info,
        LogLevel::Warning => LogSeverity::Warning,
        LogLevel::Error => LogSeverity::Error,
        LogLevel::Critical => LogSeverity::Critical,
    }
}
