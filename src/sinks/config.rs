//! Sink configuration shared by the structured payload factories

use crate::core::{LoggerError, Result};
use crate::outputs::STDOUT_URI;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the logger category ends up in an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryHandling {
    #[default]
    Ignore,
    /// `category` label
    IncludeAsLabel,
    /// `[category] ` message prefix
    IncludeInMessage,
}

/// Whether the event id prefixes the message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventIdHandling {
    #[default]
    Ignore,
    IncludeAlways,
    /// Only ids other than `0` and `-1`
    IncludeValidIds,
}

/// Which entries carry the request trace id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceHandling {
    #[default]
    Disabled,
    /// Request summaries only
    Summary,
    Enabled,
}

fn parse_variant<T: Copy>(key: &str, raw: &str, variants: &[(&str, T)]) -> Result<T> {
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw.trim()))
        .map(|&(_, value)| value)
        .ok_or_else(|| LoggerError::config(key, format!("unknown value {:?}", raw)))
}

impl FromStr for CategoryHandling {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_variant(
            "category_handling",
            s,
            &[
                ("Ignore", CategoryHandling::Ignore),
                ("IncludeAsLabel", CategoryHandling::IncludeAsLabel),
                ("IncludeInMessage", CategoryHandling::IncludeInMessage),
            ],
        )
    }
}

impl FromStr for EventIdHandling {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_variant(
            "event_id_handling",
            s,
            &[
                ("Ignore", EventIdHandling::Ignore),
                ("IncludeAlways", EventIdHandling::IncludeAlways),
                ("IncludeValidIds", EventIdHandling::IncludeValidIds),
            ],
        )
    }
}

impl FromStr for TraceHandling {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_variant(
            "trace_handling",
            s,
            &[
                ("Disabled", TraceHandling::Disabled),
                ("Summary", TraceHandling::Summary),
                ("Enabled", TraceHandling::Enabled),
            ],
        )
    }
}

impl fmt::Display for CategoryHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for EventIdHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for TraceHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn default_output() -> String {
    STDOUT_URI.to_string()
}

/// Settings of a structured sink.
///
/// # Example
/// ```
/// use rust_sink_logging::sinks::SinkConfig;
///
/// let config = SinkConfig::new("my-project", "checkout");
/// assert_eq!(config.log_name(), "projects/my-project/logs/checkout");
/// assert_eq!(config.trace_name("abc"), "projects/my-project/traces/abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub project_id: String,
    pub service: String,
    #[serde(default)]
    pub service_version: Option<String>,
    /// Defaults to `service`
    #[serde(default)]
    pub log_id: Option<String>,
    #[serde(default)]
    pub category_handling: CategoryHandling,
    #[serde(default)]
    pub event_id_handling: EventIdHandling,
    #[serde(default)]
    pub trace_handling: TraceHandling,
    #[serde(default = "default_output")]
    pub output: String,
}

impl SinkConfig {
    pub fn new(project_id: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            service: service.into(),
            service_version: None,
            log_id: None,
            category_handling: CategoryHandling::default(),
            event_id_handling: EventIdHandling::default(),
            trace_handling: TraceHandling::default(),
            output: default_output(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_log_id(mut self, log_id: impl Into<String>) -> Self {
        self.log_id = Some(log_id.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_category_handling(mut self, handling: CategoryHandling) -> Self {
        self.category_handling = handling;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_event_id_handling(mut self, handling: EventIdHandling) -> Self {
        self.event_id_handling = handling;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_trace_handling(mut self, handling: TraceHandling) -> Self {
        self.trace_handling = handling;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Reject settings that cannot produce valid entries.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(LoggerError::config("project_id", "project id must not be empty"));
        }
        if self.service.trim().is_empty() {
            return Err(LoggerError::config("service", "service must not be empty"));
        }
        if self.log_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(LoggerError::config("log_id", "log id must not be blank"));
        }
        if self.output.trim().is_empty() {
            return Err(LoggerError::config("output", "output must not be empty"));
        }
        Ok(())
    }

    pub fn log_id(&self) -> &str {
        self.log_id.as_deref().unwrap_or(&self.service)
    }

    pub fn log_name(&self) -> String {
        format!("projects/{}/logs/{}", self.project_id, self.log_id())
    }

    pub fn trace_name(&self, trace_id: &str) -> String {
        format!("projects/{}/traces/{}", self.project_id, trace_id)
    }
}
