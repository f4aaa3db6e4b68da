//! Log message passed from loggers to the provider worker

use super::event_id::EventId;
use super::log_level::LogLevel;
use super::web_context::WebContext;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;

/// Error attached to a log call. Its `source()` chain is walked when rendered.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Request context carried by web messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebScope {
    pub context: WebContext,
    pub is_request_summary: bool,
}

/// A single log record.
///
/// Built on the producer thread with the formatted text already evaluated, then
/// consumed once by the worker. Messages are recycled through the provider's
/// pool, so [`LogMessage::update`] overwrites every field in place.
#[derive(Debug, Clone)]
pub struct LogMessage {
    timestamp: DateTime<Utc>,
    category: String,
    level: LogLevel,
    event_id: EventId,
    error: Option<SharedError>,
    message: String,
    web: Option<WebScope>,
}

impl LogMessage {
    pub fn new(
        category: impl Into<String>,
        level: LogLevel,
        event_id: EventId,
        error: Option<SharedError>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category: category.into(),
            level,
            event_id,
            error,
            message: message.into(),
            web: None,
        }
    }

    /// Attach a request context snapshot.
    #[must_use = "builder methods return a new value"]
    pub fn with_web_context(mut self, context: WebContext, is_request_summary: bool) -> Self {
        self.web = Some(WebScope {
            context,
            is_request_summary,
        });
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Overwrite a recycled message. The category buffer keeps its capacity.
    pub(crate) fn update(
        &mut self,
        category: &str,
        level: LogLevel,
        event_id: EventId,
        error: Option<SharedError>,
        message: String,
        web: Option<WebScope>,
    ) {
        self.timestamp = Utc::now();
        self.category.clear();
        self.category.push_str(category);
        self.level = level;
        self.event_id = event_id;
        self.error = error;
        self.message = message;
        self.web = web;
    }

    /// Drop references held by a message before it goes back to the pool.
    pub(crate) fn clear(&mut self) {
        self.category.clear();
        self.error = None;
        self.message = String::new();
        self.web = None;
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[inline]
    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    #[inline]
    pub fn error(&self) -> Option<&SharedError> {
        self.error.as_ref()
    }

    /// Formatter output captured at creation.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn web(&self) -> Option<&WebScope> {
        self.web.as_ref()
    }

    /// Request context of a web message, `None` for plain messages.
    #[inline]
    pub fn web_context(&self) -> Option<&WebContext> {
        self.web.as_ref().map(|w| &w.context)
    }

    #[inline]
    pub fn is_request_summary(&self) -> bool {
        self.web.as_ref().is_some_and(|w| w.is_request_summary)
    }

    /// Rendered error chain, `None` when no error is attached.
    pub fn error_text(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| render_error_chain(e.as_ref() as &(dyn Error + 'static)))
    }
}

/// Render an error and its sources, one `Caused by:` line per source.
pub fn render_error_chain(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        let _ = write!(text, "\nCaused by: {}", source);
        current = source.source();
    }
    text
}
