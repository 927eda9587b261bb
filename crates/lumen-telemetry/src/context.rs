//! Request context for correlating log lines of one operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context carried through an operation for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Component that created this context.
    pub component: String,
    /// Operation being performed.
    pub operation: Option<String>,
    /// Session the operation belongs to.
    pub session_key: Option<String>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a new request context.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            component: component.into(),
            operation: None,
            session_key: None,
            started_at: Utc::now(),
        }
    }

    /// Use an existing identifier as the request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: Uuid) -> Self {
        self.request_id = id;
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the session key.
    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Create a tracing span with this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            component = %self.component,
            operation = self.operation.as_deref(),
            session_key = self.session_key.as_deref(),
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Guard that enters the context span and logs when the request completes.
pub struct RequestGuard {
    context: RequestContext,
    _span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("Request started");
        Self {
            context,
            _span: span,
        }
    }

    /// Get the request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "Request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_builder() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::new("runner")
            .with_request_id(id)
            .with_operation("run")
            .with_session_key("chat-1");

        assert_eq!(ctx.request_id, id);
        assert_eq!(ctx.component, "runner");
        assert_eq!(ctx.operation.as_deref(), Some("run"));
        assert_eq!(ctx.session_key.as_deref(), Some("chat-1"));
        assert!(ctx.elapsed_ms() >= 0);
    }

    #[test]
    fn test_guard_exposes_context() {
        let guard = RequestGuard::new(RequestContext::new("test"));
        assert_eq!(guard.context().component, "test");
    }
}
