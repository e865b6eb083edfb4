//! Request-scoped correlation context threaded through a span.

use tracing::Span;
use uuid::Uuid;

/// A correlation id plus component/operation labels, carried as a tracing
/// span so every log line emitted during a request shares the same id.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    component: String,
    operation: Option<String>,
}

impl RequestContext {
    /// Start a context for `component`, generating a fresh correlation id.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            component: component.into(),
            operation: None,
        }
    }

    /// Reuse an existing correlation id (e.g. one carried on an inbound
    /// IPC or HTTP request) instead of generating a new one.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Attach an operation label.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The correlation id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Build the tracing span for this context. Callers enter it with
    /// `.entered()` (sync) or hold the returned [`RequestGuard`] across an
    /// `.await` boundary.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or("")
        )
    }

    /// Enter the span, returning a guard that exits it on drop. Prefer
    /// this over holding an `Entered` guard across `.await` points, which
    /// `tracing` warns against.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard {
            _span: self.span(),
        }
    }
}

/// RAII guard returned by [`RequestContext::enter`].
#[derive(Debug)]
pub struct RequestGuard {
    _span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_request_id() {
        let ctx = RequestContext::new("router");
        assert!(!ctx.request_id().is_empty());
    }

    #[test]
    fn test_with_request_id_overrides_generated_id() {
        let ctx = RequestContext::new("router").with_request_id("fixed-id");
        assert_eq!(ctx.request_id(), "fixed-id");
    }

    #[test]
    fn test_two_contexts_get_distinct_ids() {
        let a = RequestContext::new("router");
        let b = RequestContext::new("router");
        assert_ne!(a.request_id(), b.request_id());
    }
}
