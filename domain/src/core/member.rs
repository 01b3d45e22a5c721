//! Council member value objects

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Identifier of a council member (e.g. "claude", "gpt-east")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One backend queried for an answer to the same prompt.
///
/// Immutable once loaded for a request: the council is cloned into each
/// request flow, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilMember {
    /// Stable member identifier
    pub id: MemberId,
    /// Backend identifier used to route the provider call
    pub backend: String,
    /// Vote weight used by the weighted-merge synthesis
    pub weight: f64,
    /// Disabled members are never selected
    pub enabled: bool,
}

impl CouncilMember {
    /// Create an enabled member with weight 1.0
    pub fn new(id: impl Into<MemberId>, backend: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            weight: 1.0,
            enabled: true,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Validate identifier, backend and weight
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::InvalidMember("member id cannot be empty".to_string()));
        }
        if self.backend.trim().is_empty() {
            return Err(DomainError::InvalidMember(format!(
                "member {}: backend cannot be empty",
                self.id
            )));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(DomainError::InvalidMember(format!(
                "member {}: weight must be positive, got {}",
                self.id, self.weight
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for CouncilMember {
    type Err = DomainError;

    /// Parse `id=backend[:weight]` (the CLI `--member` syntax)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s
            .split_once('=')
            .ok_or_else(|| DomainError::InvalidMember(format!("expected id=backend, got '{}'", s)))?;

        let member = match rest.rsplit_once(':') {
            Some((backend, weight)) if weight.parse::<f64>().is_ok() => {
                let weight: f64 = weight
                    .parse()
                    .map_err(|_| DomainError::InvalidMember(format!("invalid weight '{}'", weight)))?;
                CouncilMember::new(id.trim(), backend.trim()).with_weight(weight)
            }
            _ => CouncilMember::new(id.trim(), rest.trim()),
        };

        member.validate()?;
        Ok(member)
    }
}
