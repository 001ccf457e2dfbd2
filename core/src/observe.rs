//! Retry observability
//!
//! The executor reports each scheduled retry to a [`RetrySink`]. Nothing is
//! emitted for a success, and exhaustion surfaces only as the returned error.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Record of one scheduled retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// 1-indexed number of the invocation that just failed.
    pub attempt: u32,
    /// Retries still allowed, counting the one about to be scheduled.
    pub attempts_remaining: u32,
    /// Wait before the next invocation.
    pub next_delay: Duration,
    /// `Display` rendering of the failure.
    pub failure_summary: String,
}

/// Destination for [`RetryEvent`]s.
pub trait RetrySink: Send + Sync {
    /// Record one retry.
    fn record(&self, event: &RetryEvent);
}

/// Logs each retry as a structured `tracing` warning (the default sink).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RetrySink for TracingSink {
    fn record(&self, event: &RetryEvent) {
        tracing::warn!(
            attempt = event.attempt,
            attempts_remaining = event.attempts_remaining,
            next_delay_ms = event.next_delay.as_millis() as u64,
            error = %event.failure_summary,
            "operation failed, retrying"
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl RetrySink for NoopSink {
    fn record(&self, _event: &RetryEvent) {}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<RetryEvent>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<RetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no event was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RetrySink for CollectingSink {
    fn record(&self, event: &RetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(attempt: u32) -> RetryEvent {
        RetryEvent {
            attempt,
            attempts_remaining: 3 - attempt,
            next_delay: Duration::from_millis(100 * u64::from(attempt)),
            failure_summary: "net error".to_string(),
        }
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());

        sink.record(&event(1));
        sink.record(&event(2));

        let events = sink.events();
        assert_eq!(sink.len(), 2);
        assert_eq!(events[0].attempt, 1);
        assert_eq!(events[1].next_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_tracing_and_noop_sinks_accept_events() {
        let sinks: [&dyn RetrySink; 2] = [&TracingSink, &NoopSink];
        for sink in sinks {
            sink.record(&event(1));
        }
    }
}
