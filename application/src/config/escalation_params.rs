//! Escalation parameters.

use std::time::Duration;

use council_domain::DomainError;
use serde::{Deserialize, Serialize};

/// Rate limiting, persistence retries and text caps for the escalation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationParams {
    /// Escalations notified per rolling window.
    pub rate_limit: usize,
    pub rate_window: Duration,
    /// Persistence attempts before a write is given up.
    pub persist_attempts: u32,
    /// First retry delay; doubled after every failed attempt.
    pub persist_backoff: Duration,
    /// Cap on reason and resolution text, in characters.
    pub max_text_chars: usize,
    /// How long shutdown waits for in-flight notifications.
    pub notify_drain_timeout: Duration,
}

impl Default for EscalationParams {
    fn default() -> Self {
        Self {
            rate_limit: 5,
            rate_window: Duration::from_secs(3600),
            persist_attempts: 3,
            persist_backoff: Duration::from_millis(100),
            max_text_chars: 500,
            notify_drain_timeout: Duration::from_secs(10),
        }
    }
}

impl EscalationParams {
    pub fn with_rate_limit(mut self, limit: usize) -> Self {
        self.rate_limit = limit;
        self
    }

    pub fn with_persist_attempts(mut self, attempts: u32) -> Self {
        self.persist_attempts = attempts;
        self
    }

    pub fn with_persist_backoff(mut self, backoff: Duration) -> Self {
        self.persist_backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.persist_attempts == 0 {
            return Err(DomainError::InvalidConfig(
                "escalation.persist_attempts must be at least 1".to_string(),
            ));
        }
        if self.rate_window.is_zero() {
            return Err(DomainError::InvalidConfig(
                "escalation.rate_window must be positive".to_string(),
            ));
        }
        if self.max_text_chars == 0 {
            return Err(DomainError::InvalidConfig(
                "escalation.max_text_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
