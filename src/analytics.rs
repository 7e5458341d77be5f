//! Fire-and-forget analytics.
//!
//! The dispatcher emits one [`AnalyticsEvent`] per request. Sinks must
//! return immediately and must never fail the request; a sink that cannot
//! deliver an event drops it.

use serde::Serialize;
use tokio::sync::mpsc;

pub const QUERY_COMPLETED: &str = "query_completed";
pub const QUERY_FAILED: &str = "query_failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    /// [`QUERY_COMPLETED`] or [`QUERY_FAILED`].
    pub name: &'static str,
    pub pipeline: String,
    pub success: bool,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
    /// `DispatchError::code()` for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

pub trait AnalyticsSink: Send + Sync {
    fn emit(&self, event: AnalyticsEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn emit(&self, _event: AnalyticsEvent) {}
}

/// Logs every event through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn emit(&self, event: AnalyticsEvent) {
        tracing::info!(
            event = event.name,
            pipeline = %event.pipeline,
            success = event.success,
            elapsed_ms = event.elapsed_ms,
            cache_hit = event.cache_hit,
            error_code = event.error_code.unwrap_or(""),
            "analytics"
        );
    }
}

/// Forwards events to an unbounded channel.
///
/// Sending never blocks; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AnalyticsEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AnalyticsSink for ChannelSink {
    fn emit(&self, event: AnalyticsEvent) {
        let _ = self.tx.send(event);
    }
}
