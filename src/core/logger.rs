//! Logger front door
//!
//! A [`Logger`] turns a log call into a [`LogMessage`] on the calling thread and
//! pushes it to its provider. The formatter runs here, exactly once, so nothing
//! borrowed from the caller outlives the call.

use super::{
    event_id::EventId,
    log_level::LogLevel,
    log_message::{LogMessage, SharedError, WebScope},
    provider::ProviderShared,
    scope::{ScopeGuard, ScopeStack},
    web_context::RequestSummary,
};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Value pushed with [`Logger::begin_scope`].
pub type ScopeValue = Arc<dyn fmt::Debug + Send + Sync>;

pub struct Logger {
    shared: Arc<ProviderShared>,
    category: String,
    scopes: ScopeStack<ScopeValue>,
}

impl Logger {
    pub(crate) fn new(shared: Arc<ProviderShared>, category: String) -> Self {
        Self {
            shared,
            category,
            scopes: ScopeStack::new(),
        }
    }

    #[inline]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.shared.min_level()
    }

    /// Log `state` rendered by `formatter`.
    ///
    /// The formatter is invoked once, before the message is queued, and only if
    /// `level` is enabled. A panic inside it propagates to the caller.
    pub fn log<S, F>(
        &self,
        level: LogLevel,
        event_id: EventId,
        state: &S,
        error: Option<SharedError>,
        formatter: F,
    ) where
        S: ?Sized,
        F: FnOnce(&S, Option<&(dyn Error + 'static)>) -> String,
    {
        if !self.is_enabled(level) {
            return;
        }
        let text = formatter(
            state,
            error.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static)),
        );
        self.push(level, event_id, error, text, None);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log_text(LogLevel::Trace, EventId::default(), None, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log_text(LogLevel::Debug, EventId::default(), None, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log_text(LogLevel::Info, EventId::default(), None, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log_text(LogLevel::Warning, EventId::default(), None, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log_text(LogLevel::Error, EventId::default(), None, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log_text(LogLevel::Critical, EventId::default(), None, message);
    }

    /// Log with an attached error. Its source chain is rendered by the sink.
    pub fn log_error<E>(&self, level: LogLevel, message: impl Into<String>, error: E)
    where
        E: Error + Send + Sync + 'static,
    {
        self.log_text(level, EventId::default(), Some(Arc::new(error)), message);
    }

    pub fn log_with_event(
        &self,
        level: LogLevel,
        event_id: impl Into<EventId>,
        message: impl Into<String>,
    ) {
        self.log_text(level, event_id.into(), None, message);
    }

    /// Log the end of a request. The current request context is completed with the
    /// values in `summary` and the message is marked as a request summary.
    ///
    /// Without a context source this is a plain log call.
    pub fn log_request_summary(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        summary: &RequestSummary,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let web = self.shared.context_source().map(|source| {
            let mut context = source.current();
            summary.apply(&mut context);
            WebScope {
                context,
                is_request_summary: true,
            }
        });
        self.push(level, EventId::default(), None, message.into(), web);
    }

    /// Push `state` onto this logger's scope stack until the guard is dropped.
    pub fn begin_scope<T>(&self, state: T) -> ScopeGuard<'_, ScopeValue>
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        self.scopes.begin(Arc::new(state))
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Current scopes, outermost first.
    pub fn scopes(&self) -> Vec<ScopeValue> {
        self.scopes.values()
    }

    fn log_text(
        &self,
        level: LogLevel,
        event_id: EventId,
        error: Option<SharedError>,
        message: impl Into<String>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        self.push(level, event_id, error, message.into(), None);
    }

    fn push(
        &self,
        level: LogLevel,
        event_id: EventId,
        error: Option<SharedError>,
        text: String,
        web: Option<WebScope>,
    ) {
        let web = web.or_else(|| {
            self.shared.context_source().map(|source| WebScope {
                context: source.current(),
                is_request_summary: false,
            })
        });
        let message = match self.shared.rent_message() {
            Some(mut message) => {
                message.update(&self.category, level, event_id, error, text, web);
                message
            }
            None => {
                let mut message =
                    LogMessage::new(self.category.as_str(), level, event_id, error, text);
                if let Some(web) = web {
                    message = message.with_web_context(web.context, web.is_request_summary);
                }
                Box::new(message)
            }
        };
        self.shared.push(message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .field("scopes", &self.scopes)
            .finish()
    }
}
