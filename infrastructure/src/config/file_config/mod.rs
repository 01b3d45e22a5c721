//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain policies and
//! application params; `validate()` reports every problem at once.

mod consensus;
mod council;
mod dispatch;
mod embedding;
mod escalation;
mod health;
mod output;
mod providers;

pub use consensus::FileConsensusConfig;
pub use council::{FileCouncilConfig, FileMemberConfig};
pub use dispatch::FileDispatchConfig;
pub use embedding::FileEmbeddingConfig;
pub use escalation::{FileChannelConfig, FileEscalationConfig};
pub use health::FileHealthConfig;
pub use output::{FileLoggingConfig, FileOutputConfig, FileOutputFormat};
pub use providers::FileProviderConfig;

use std::collections::BTreeMap;
use std::time::Duration;

use council_application::{CouncilParams, DispatchParams, EscalationParams};
use council_domain::{
    ConfigIssue, ConfigIssueCode, HealthPolicy, MemberId, Severity, SynthesisStrategy,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration that cannot be used
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration:\n{}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub council: FileCouncilConfig,
    pub consensus: FileConsensusConfig,
    pub dispatch: FileDispatchConfig,
    pub health: FileHealthConfig,
    pub escalation: FileEscalationConfig,
    /// Named provider endpoints, referenced by member `backend`
    pub providers: BTreeMap<String, FileProviderConfig>,
    pub embedding: FileEmbeddingConfig,
    pub output: FileOutputConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let (members, mut issues) = self.council.parse_members();
        let (policy, consensus_issues) = self.consensus.to_policy();
        issues.extend(consensus_issues);
        let (strategy, strategy_issues) = self.consensus.parse_strategy();
        issues.extend(strategy_issues);
        issues.extend(self.dispatch.to_params().1);
        issues.extend(self.health.to_policy().1);
        issues.extend(self.escalation.to_params().1);

        for member in &members {
            if !self.providers.contains_key(&member.backend) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownProvider,
                    format!(
                        "member '{}' uses backend '{}' with no [providers.{}] entry",
                        member.id, member.backend, member.backend
                    ),
                ));
            }
        }

        let enabled = members.iter().filter(|m| m.enabled).count();
        if enabled > 0 && enabled < policy.min_responses {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::TooFewMembers,
                format!(
                    "{} enabled member(s) can never reach consensus.min_responses = {}",
                    enabled, policy.min_responses
                ),
            ));
        }

        if strategy == SynthesisStrategy::Moderator {
            match &self.council.moderator {
                None => issues.push(ConfigIssue::error(
                    ConfigIssueCode::MissingModerator,
                    "consensus.strategy = \"moderator\" requires council.moderator",
                )),
                Some(id) if !members.iter().any(|m| m.id.as_str() == id) => {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::MissingModerator,
                        format!("council.moderator '{}' is not a council member", id),
                    ))
                }
                Some(_) => {}
            }
        }

        for (name, provider) in &self.providers {
            if let Some(var) = &provider.api_key_env
                && provider.api_key.is_none()
                && provider.resolve_api_key().is_none()
            {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::MissingApiKey,
                    format!("providers.{}: environment variable {} is not set", name, var),
                ));
            }
        }

        issues
    }

    /// Validate, failing on any error-level issue. Returns the warnings.
    pub fn check(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) = self
            .validate()
            .into_iter()
            .partition(|issue| issue.severity == Severity::Error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError::Invalid(errors))
        }
    }

    pub fn council_params(&self) -> CouncilParams {
        let (members, _) = self.council.parse_members();
        CouncilParams {
            members,
            consensus: self.consensus.to_policy().0,
            strategy: self.consensus.parse_strategy().0,
            moderator: self.council.moderator.as_deref().map(MemberId::new),
            share_peer_answers: self.council.share_peer_answers,
            request_timeout: Duration::from_secs(self.council.request_timeout_secs),
            max_query_chars: self.council.max_query_chars,
        }
    }

    pub fn dispatch_params(&self) -> DispatchParams {
        self.dispatch.to_params().0
    }

    pub fn health_policy(&self) -> HealthPolicy {
        self.health.to_policy().0
    }

    pub fn escalation_params(&self) -> EscalationParams {
        self.escalation.to_params().0
    }
}
