//! Health classification from TOML (`[health]` section)

use council_domain::{ConfigIssue, ConfigIssueCode, HealthPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ```toml
/// [health]
/// window = 20
/// healthy_threshold = 0.8
/// degraded_threshold = 0.5
/// upgrade_streak = 3
/// min_samples = 5
/// recovery_after_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHealthConfig {
    pub window: usize,
    pub healthy_threshold: f64,
    pub degraded_threshold: f64,
    pub upgrade_streak: u32,
    pub min_samples: usize,
    /// Seconds a disabled member sits out after its last failure
    pub recovery_after_secs: u64,
}

impl Default for FileHealthConfig {
    fn default() -> Self {
        let policy = HealthPolicy::default();
        Self {
            window: policy.window,
            healthy_threshold: policy.healthy_threshold,
            degraded_threshold: policy.degraded_threshold,
            upgrade_streak: policy.upgrade_streak,
            min_samples: policy.min_samples,
            recovery_after_secs: policy.recovery_after.as_secs(),
        }
    }
}

impl FileHealthConfig {
    pub fn to_policy(&self) -> (HealthPolicy, Vec<ConfigIssue>) {
        let policy = HealthPolicy {
            window: self.window,
            healthy_threshold: self.healthy_threshold,
            degraded_threshold: self.degraded_threshold,
            upgrade_streak: self.upgrade_streak,
            min_samples: self.min_samples,
            recovery_after: Duration::from_secs(self.recovery_after_secs),
        };
        let issues = match policy.validate() {
            Ok(()) => Vec::new(),
            Err(e) => vec![ConfigIssue::error(
                ConfigIssueCode::InvalidThreshold,
                e.to_string(),
            )],
        };
        (policy, issues)
    }
}
