//! Member response value object

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::member::MemberId;

/// One member's answer (or explicit error) for one round.
///
/// Timeouts never produce a `MemberResponse`: a member that did not answer
/// in time simply has no slot for that round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub member: MemberId,
    pub round: u32,
    /// Answer text, empty when `error` is set
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// Wall time of the provider call
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MemberResponse {
    pub fn success(
        member: impl Into<MemberId>,
        round: u32,
        content: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            member: member.into(),
            round,
            content: content.into(),
            received_at: Utc::now(),
            latency_ms,
            error: None,
        }
    }

    pub fn failure(
        member: impl Into<MemberId>,
        round: u32,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            member: member.into(),
            round,
            content: String::new(),
            received_at: Utc::now(),
            latency_ms,
            error: Some(error.into()),
        }
    }

    /// A response counts toward agreement scoring only without an error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
