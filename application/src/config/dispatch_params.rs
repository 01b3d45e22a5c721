//! Dispatch parameters: timing of one round's fan-out.

use std::time::Duration;

use council_domain::DomainError;
use serde::{Deserialize, Serialize};

/// Timing and replacement policy for a round of provider calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchParams {
    /// Overall deadline of one round, measured from its start.
    pub round_deadline: Duration,
    /// Timeout of a single provider call (never above `round_deadline`).
    pub call_timeout: Duration,
    /// Extra time after the deadline during which in-flight calls may still land.
    pub grace: Duration,
    /// Upper bound on members queried per round (`None`: everyone selectable).
    pub max_members: Option<usize>,
    /// Replace a member that fails with a provider error before the deadline.
    pub replace_failed: bool,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            round_deadline: Duration::from_secs(60),
            call_timeout: Duration::from_secs(45),
            grace: Duration::from_secs(2),
            max_members: None,
            replace_failed: true,
        }
    }
}

impl DispatchParams {
    pub fn with_round_deadline(mut self, deadline: Duration) -> Self {
        self.round_deadline = deadline;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_max_members(mut self, max: usize) -> Self {
        self.max_members = Some(max);
        self
    }

    pub fn with_replace_failed(mut self, replace: bool) -> Self {
        self.replace_failed = replace;
        self
    }

    /// Per-call timeout clamped to the round deadline
    pub fn effective_call_timeout(&self) -> Duration {
        self.call_timeout.min(self.round_deadline)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.round_deadline.is_zero() {
            return Err(DomainError::InvalidConfig(
                "dispatch.round_deadline must be positive".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(DomainError::InvalidConfig(
                "dispatch.call_timeout must be positive".to_string(),
            ));
        }
        if self.call_timeout > self.round_deadline {
            return Err(DomainError::InvalidConfig(format!(
                "dispatch.call_timeout ({:?}) exceeds dispatch.round_deadline ({:?})",
                self.call_timeout, self.round_deadline
            )));
        }
        if self.max_members == Some(0) {
            return Err(DomainError::InvalidConfig(
                "dispatch.max_members must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
