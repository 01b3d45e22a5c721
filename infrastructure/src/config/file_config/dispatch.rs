//! Round timing from TOML (`[dispatch]` section)

use std::time::Duration;

use council_application::DispatchParams;
use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatchConfig {
    pub round_deadline_secs: u64,
    pub call_timeout_secs: u64,
    pub grace_ms: u64,
    /// Members queried per round (unset: everyone selectable)
    pub max_members: Option<usize>,
    pub replace_failed: bool,
}

impl Default for FileDispatchConfig {
    fn default() -> Self {
        let params = DispatchParams::default();
        Self {
            round_deadline_secs: params.round_deadline.as_secs(),
            call_timeout_secs: params.call_timeout.as_secs(),
            grace_ms: params.grace.as_millis() as u64,
            max_members: params.max_members,
            replace_failed: params.replace_failed,
        }
    }
}

impl FileDispatchConfig {
    /// Convert to params. A per-call timeout above the round deadline is a
    /// warning only: the dispatcher clamps it.
    pub fn to_params(&self) -> (DispatchParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        if self.round_deadline_secs == 0 || self.call_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidDuration,
                "dispatch.round_deadline_secs and dispatch.call_timeout_secs must be positive",
            ));
        }
        if self.call_timeout_secs > self.round_deadline_secs {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::TimeoutExceedsDeadline,
                format!(
                    "dispatch.call_timeout_secs ({}) exceeds round_deadline_secs ({}), clamping",
                    self.call_timeout_secs, self.round_deadline_secs
                ),
            ));
        }
        if self.max_members == Some(0) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidThreshold,
                "dispatch.max_members must be at least 1",
            ));
        }

        let round_deadline = Duration::from_secs(self.round_deadline_secs);
        let params = DispatchParams {
            round_deadline,
            call_timeout: Duration::from_secs(self.call_timeout_secs).min(round_deadline),
            grace: Duration::from_millis(self.grace_ms),
            max_members: self.max_members,
            replace_failed: self.replace_failed,
        };
        (params, issues)
    }
}
