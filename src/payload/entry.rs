//! Line-protocol log record
//!
//! One [`LogEntry`] is serialized per line for a log collector. Field names follow
//! the collector's camelCase contract; trace and labels use the special
//! `logging.googleapis.com/*` keys.

use super::converters;
use super::severity::LogSeverity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const LABELS_KEY: &str = "logging.googleapis.com/labels";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Request details attached to error entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub method: String,
    pub url: String,
    pub user_agent: String,
    pub referer: String,
    pub response_status_code: u16,
    pub remote_ip: String,
    pub user: String,
}

/// Request details attached to request-summary entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub request_method: String,
    pub request_url: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,
    pub user_agent: String,
    pub remote_ip: String,
    pub referer: String,
    #[serde(
        default,
        with = "converters::latency",
        skip_serializing_if = "Option::is_none"
    )]
    pub latency: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub log_name: String,
    pub severity: LogSeverity,
    pub message: String,
    #[serde(with = "converters::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_context: Option<ServiceContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequest>,
    #[serde(
        rename = "logging.googleapis.com/trace",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub trace: Option<String>,
    #[serde(rename = "logging.googleapis.com/labels", default)]
    pub labels: HashMap<String, String>,
}

impl Default for LogEntry {
    fn default() -> Self {
        Self {
            log_name: String::new(),
            severity: LogSeverity::Default,
            message: String::new(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            service_context: None,
            context: None,
            http_request: None,
            trace: None,
            labels: HashMap::new(),
        }
    }
}

impl LogEntry {
    /// Reset a recycled entry. String and map buffers keep their capacity.
    pub fn clear(&mut self) {
        self.log_name.clear();
        self.severity = LogSeverity::Default;
        self.message.clear();
        self.timestamp = DateTime::<Utc>::UNIX_EPOCH;
        self.service_context = None;
        self.context = None;
        self.http_request = None;
        self.trace = None;
        self.labels.clear();
    }
}
