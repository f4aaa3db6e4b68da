//! Request-context snapshot consumed by the pipeline
//!
//! The hosting framework produces [`WebContext`] values; the pipeline only reads
//! them. `WebContext::default()` means "no request in scope".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Request headers, shared between snapshots of the same request.
pub type Headers = Arc<HashMap<String, Vec<String>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebContext {
    pub connection_id: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub response_status_code: Option<u16>,
    pub remote_ip: Option<String>,
    pub trace_id: Option<String>,
    pub headers: Option<Headers>,
    pub user: Option<String>,
    pub latency: Option<Duration>,
    pub response_content_type: Option<String>,
    pub response_content_length: Option<u64>,
}

impl WebContext {
    /// Snapshot populated at request start.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Whether this snapshot describes a request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == WebContext::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_remote_ip(mut self, remote_ip: impl Into<String>) -> Self {
        self.remote_ip = Some(remote_ip.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_headers(mut self, headers: HashMap<String, Vec<String>>) -> Self {
        self.headers = Some(Arc::new(headers));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_status(mut self, status: u16) -> Self {
        self.response_status_code = Some(status);
        self
    }

    /// Refresh the fields that change while the request runs.
    pub fn update(&mut self, user: Option<String>, response_status_code: Option<u16>) {
        if user.is_some() {
            self.user = user;
        }
        if response_status_code.is_some() {
            self.response_status_code = response_status_code;
        }
    }
}

/// Values known once a request has finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSummary {
    pub latency: Option<Duration>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl RequestSummary {
    /// Overwrite the response fields of `context` with the finished values.
    pub fn apply(&self, context: &mut WebContext) {
        context.latency = self.latency;
        if self.status.is_some() {
            context.response_status_code = self.status;
        }
        context.response_content_type = self.content_type.clone();
        context.response_content_length = self.content_length;
    }
}

/// Source of the "current request" snapshot, provided by the hosting framework.
pub trait WebContextSource: Send + Sync {
    /// Snapshot of the request in scope on the calling thread, or the default
    /// value when there is none.
    fn current(&self) -> WebContext;
}

impl<F> WebContextSource for F
where
    F: Fn() -> WebContext + Send + Sync,
{
    fn current(&self) -> WebContext {
        self()
    }
}
