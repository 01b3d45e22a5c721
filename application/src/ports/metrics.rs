//! Observability sink port
//!
//! Named numeric signals with a few string labels. Adapters decide where
//! they go (tracing events, a metrics backend).

use council_domain::{HealthStatus, MemberId, RequestId};

pub const ROUNDS_PER_REQUEST: &str = "rounds_per_request";
pub const CONSENSUS_SCORE: &str = "consensus_score";
pub const ESCALATION_QUEUE_DEPTH: &str = "escalation_queue_depth";
pub const HEALTH_STATUS_TRANSITION: &str = "health_status_transition";

/// One named numeric observation
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSignal {
    pub name: &'static str,
    pub value: f64,
    pub labels: Vec<(&'static str, String)>,
}

impl MetricSignal {
    pub fn new(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            labels: Vec::new(),
        }
    }

    pub fn label(mut self, key: &'static str, value: impl ToString) -> Self {
        self.labels.push((key, value.to_string()));
        self
    }

    pub fn rounds_per_request(request_id: &RequestId, rounds: usize, outcome: &str) -> Self {
        Self::new(ROUNDS_PER_REQUEST, rounds as f64)
            .label("request_id", request_id)
            .label("outcome", outcome)
    }

    pub fn consensus_score(request_id: &RequestId, round: u32, score: f64) -> Self {
        Self::new(CONSENSUS_SCORE, score)
            .label("request_id", request_id)
            .label("round", round)
    }

    pub fn escalation_queue_depth(depth: usize) -> Self {
        Self::new(ESCALATION_QUEUE_DEPTH, depth as f64)
    }

    pub fn health_transition(member: &MemberId, from: HealthStatus, to: HealthStatus) -> Self {
        Self::new(HEALTH_STATUS_TRANSITION, 1.0)
            .label("member", member)
            .label("from", from)
            .label("to", to)
    }

    pub fn label_value(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Port for emitting signals. Must never fail or block the caller.
pub trait MetricsSink: Send + Sync {
    fn record(&self, signal: MetricSignal);
}

/// No-op sink for tests and when metrics are disabled.
pub struct NoMetrics;

impl MetricsSink for NoMetrics {
    fn record(&self, _signal: MetricSignal) {}
}
