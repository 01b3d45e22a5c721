//! Escalation ticket entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{RequestId, TicketId};

/// Lifecycle state of an escalation ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting for a human reviewer
    Pending,
    /// Closed by a reviewer
    Resolved,
    /// Recorded but suppressed by the escalation rate limit; nobody was notified
    RateLimited,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Resolved => "resolved",
            TicketStatus::RateLimited => "rate_limited",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(TicketStatus::Pending),
            "resolved" => Ok(TicketStatus::Resolved),
            "rate_limited" => Ok(TicketStatus::RateLimited),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// A deadlocked request handed to human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub id: TicketId,
    pub request_id: RequestId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EscalationTicket {
    fn with_status(request_id: RequestId, reason: impl Into<String>, status: TicketStatus) -> Self {
        Self {
            id: TicketId::generate(),
            request_id,
            reason: reason.into(),
            created_at: Utc::now(),
            status,
            reviewer: None,
            resolution: None,
            resolved_at: None,
        }
    }

    pub fn pending(request_id: RequestId, reason: impl Into<String>) -> Self {
        Self::with_status(request_id, reason, TicketStatus::Pending)
    }

    pub fn rate_limited(request_id: RequestId, reason: impl Into<String>) -> Self {
        Self::with_status(request_id, reason, TicketStatus::RateLimited)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TicketStatus::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.status == TicketStatus::Resolved
    }

    /// Close the ticket. Returns `false` (and changes nothing) when it was
    /// already resolved.
    pub fn resolve(&mut self, reviewer: impl Into<String>, resolution: impl Into<String>) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.status = TicketStatus::Resolved;
        self.reviewer = Some(reviewer.into());
        self.resolution = Some(resolution.into());
        self.resolved_at = Some(Utc::now());
        true
    }
}
