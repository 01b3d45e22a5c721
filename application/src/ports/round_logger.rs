//! Port for structured round-history logging.
//!
//! Defines the [`RoundLogger`] trait for recording what happened in each
//! council round (scores, clusters, verdicts, terminal outcomes).
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the round
//! history in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured round-history event.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields; adapters add the timestamp.
pub struct RoundEvent {
    /// Event type identifier (e.g., "round_evaluated", "request_escalated").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl RoundEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging round events.
///
/// `log` is synchronous and non-fallible: history logging must never
/// disturb a request, so adapters swallow their own failures.
pub trait RoundLogger: Send + Sync {
    fn log(&self, event: RoundEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoRoundLogger;

impl RoundLogger for NoRoundLogger {
    fn log(&self, _event: RoundEvent) {}
}
