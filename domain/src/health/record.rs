//! Rolling health window for one council member.
//!
//! The record keeps only the last `window` outcomes, so behaviour that
//! happened more than `window` calls ago can never bias the current status.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::HealthStatus;
use crate::core::error::DomainError;

/// Thresholds and window sizing for health classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Number of most recent outcomes kept per member
    pub window: usize,
    /// Success rate at or above which a member is healthy
    pub healthy_threshold: f64,
    /// Success rate at or above which a member is degraded (below: disabled)
    pub degraded_threshold: f64,
    /// Consecutive better-qualifying samples required before an upgrade
    pub upgrade_streak: u32,
    /// Outcomes required before the window is trusted at all
    pub min_samples: usize,
    /// Quiet time after the last failure before a disabled member is
    /// offered calls again, at the lowest selection rank
    #[serde(default = "default_recovery_after")]
    pub recovery_after: Duration,
}

fn default_recovery_after() -> Duration {
    Duration::from_secs(30)
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            window: 20,
            healthy_threshold: 0.8,
            degraded_threshold: 0.5,
            upgrade_streak: 3,
            min_samples: 5,
            recovery_after: default_recovery_after(),
        }
    }
}

impl HealthPolicy {
    /// Raw status for a success rate, without hysteresis
    pub fn classify(&self, success_rate: f64) -> HealthStatus {
        if success_rate >= self.healthy_threshold {
            HealthStatus::Healthy
        } else if success_rate >= self.degraded_threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Disabled
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.window == 0 {
            return Err(DomainError::InvalidConfig(
                "health.window must be at least 1".to_string(),
            ));
        }
        if self.min_samples > self.window {
            return Err(DomainError::InvalidConfig(format!(
                "health.min_samples ({}) cannot exceed health.window ({})",
                self.min_samples, self.window
            )));
        }
        if !(0.0..=1.0).contains(&self.degraded_threshold)
            || !(0.0..=1.0).contains(&self.healthy_threshold)
            || self.degraded_threshold > self.healthy_threshold
        {
            return Err(DomainError::InvalidConfig(format!(
                "health thresholds must satisfy 0 <= degraded ({}) <= healthy ({}) <= 1",
                self.degraded_threshold, self.healthy_threshold
            )));
        }
        if self.upgrade_streak == 0 {
            return Err(DomainError::InvalidConfig(
                "health.upgrade_streak must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    success: bool,
    latency: Duration,
}

/// A status change produced by recording an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

/// Point-in-time view of a member's health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub success_rate: f64,
    pub mean_latency_ms: u64,
    pub samples: usize,
    pub failures: usize,
    pub last_failure: Option<DateTime<Utc>>,
    pub upgrade_streak: u32,
}

/// Per-member rolling window and derived status
#[derive(Debug, Clone)]
pub struct HealthRecord {
    outcomes: VecDeque<Outcome>,
    status: HealthStatus,
    upgrade_streak: u32,
    last_failure: Option<DateTime<Utc>>,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRecord {
    /// Fresh members start healthy
    pub fn new() -> Self {
        Self {
            outcomes: VecDeque::new(),
            status: HealthStatus::Healthy,
            upgrade_streak: 0,
            last_failure: None,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn last_failure(&self) -> Option<DateTime<Utc>> {
        self.last_failure
    }

    pub fn samples(&self) -> usize {
        self.outcomes.len()
    }

    /// Successes over samples in the window (1.0 when empty)
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 1.0;
        }
        let successes = self.outcomes.iter().filter(|o| o.success).count();
        successes as f64 / self.outcomes.len() as f64
    }

    /// Mean latency over the window (zero when empty)
    pub fn mean_latency(&self) -> Duration {
        if self.outcomes.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.outcomes.iter().map(|o| o.latency).sum();
        total / self.outcomes.len() as u32
    }

    /// A disabled member becomes eligible again once `recovery_after` has
    /// passed since its last failure. Each failed attempt restamps the
    /// failure time, so a member that keeps failing is retried at most
    /// once per cooldown.
    pub fn recovery_due(&self, policy: &HealthPolicy, now: DateTime<Utc>) -> bool {
        if self.status != HealthStatus::Disabled {
            return false;
        }
        match self.last_failure {
            None => true,
            Some(at) => {
                now.signed_duration_since(at).to_std().unwrap_or_default() >= policy.recovery_after
            }
        }
    }

    /// Record one call outcome and re-derive the status.
    ///
    /// Downgrades apply on the sample that causes them; upgrades need
    /// `policy.upgrade_streak` consecutive samples that each qualify for a
    /// better status than the current one.
    pub fn record(
        &mut self,
        success: bool,
        latency: Duration,
        policy: &HealthPolicy,
    ) -> Option<StatusChange> {
        self.outcomes.push_back(Outcome { success, latency });
        while self.outcomes.len() > policy.window {
            self.outcomes.pop_front();
        }
        if !success {
            self.last_failure = Some(Utc::now());
        }

        if self.outcomes.len() < policy.min_samples {
            return None;
        }

        let raw = policy.classify(self.success_rate());
        let from = self.status;

        if raw < from {
            self.status = raw;
            self.upgrade_streak = 0;
            return Some(StatusChange { from, to: raw });
        }

        if raw > from {
            self.upgrade_streak += 1;
            if self.upgrade_streak >= policy.upgrade_streak {
                self.status = raw;
                self.upgrade_streak = 0;
                return Some(StatusChange { from, to: raw });
            }
            return None;
        }

        self.upgrade_streak = 0;
        None
    }

    /// Forget every outcome and return to the initial status
    pub fn reset(&mut self) -> Option<StatusChange> {
        let from = self.status;
        *self = Self::new();
        (from != self.status).then_some(StatusChange {
            from,
            to: self.status,
        })
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: self.status,
            success_rate: self.success_rate(),
            mean_latency_ms: self.mean_latency().as_millis() as u64,
            samples: self.outcomes.len(),
            failures: self.outcomes.iter().filter(|o| !o.success).count(),
            last_failure: self.last_failure,
            upgrade_streak: self.upgrade_streak,
        }
    }
}
