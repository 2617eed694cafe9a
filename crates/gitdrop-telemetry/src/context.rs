//! Per-request correlation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and timing of one unit of work, such as a single upload.
///
/// Every log line emitted inside [`RequestContext::span`] carries the
/// request and correlation ids, so one upload's clone, commit, and push
/// lines can be picked out of an interleaved log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique id of this request.
    pub request_id: Uuid,
    /// Shared by a request and all of its children.
    pub correlation_id: Uuid,
    /// Request this one was spawned from.
    pub parent_id: Option<Uuid>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Component that created the context (e.g. "cli").
    pub source: String,
    /// Operation being performed (e.g. "upload").
    pub operation: Option<String>,
    /// Free-form labels.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// Start a new request.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Start a sub-request sharing this request's correlation id and labels.
    #[must_use]
    pub fn child(&self, source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Join an existing correlation chain.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Name the operation.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Attach a label.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Span carrying this request's ids.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.short_id(),
            correlation_id = %self.correlation_id,
            source = %self.source,
            operation = self.operation.as_deref(),
        )
    }

    /// First eight characters of the request id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Logs the start of a request on creation and its duration on drop.
///
/// The guard does not enter its span; instrument futures with
/// [`RequestGuard::span`] so the span follows the task across awaits.
#[derive(Debug)]
pub struct RequestGuard {
    context: RequestContext,
    span: tracing::Span,
}

impl RequestGuard {
    /// Open the request span and log that the request started.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span();
        span.in_scope(|| tracing::debug!("Request started"));
        Self { context, span }
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// The request span.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.context.elapsed_ms();
        self.span
            .in_scope(|| tracing::debug!(elapsed_ms, "Request completed"));
    }
}
