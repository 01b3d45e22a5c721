//! Member health status

use serde::{Deserialize, Serialize};

/// Derived health of a council member.
///
/// Ordered from worst to best so that `a < b` means "a is less healthy".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Disabled,
    Degraded,
    Healthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Disabled => "disabled",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Healthy => "healthy",
        }
    }

    /// Rank used for candidate selection (lower is preferred)
    pub fn selection_rank(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Disabled => 2,
        }
    }

    pub fn is_selectable(&self) -> bool {
        !matches!(self, HealthStatus::Disabled)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(HealthStatus::Disabled < HealthStatus::Degraded);
        assert!(HealthStatus::Degraded < HealthStatus::Healthy);
        assert!(HealthStatus::Healthy.selection_rank() < HealthStatus::Degraded.selection_rank());
    }

    #[test]
    fn test_selectable() {
        assert!(HealthStatus::Healthy.is_selectable());
        assert!(HealthStatus::Degraded.is_selectable());
        assert!(!HealthStatus::Disabled.is_selectable());
    }
}
