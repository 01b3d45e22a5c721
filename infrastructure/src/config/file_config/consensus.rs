//! Consensus configuration from TOML (`[consensus]` section)

use council_domain::{ConfigIssue, ConfigIssueCode, ConsensusPolicy, SynthesisStrategy};
use serde::{Deserialize, Serialize};

/// Agreement thresholds, round budget and synthesis strategy
///
/// # Example
///
/// ```toml
/// [consensus]
/// similarity_threshold = 0.8   # τ: pairwise edge threshold
/// consensus_threshold = 0.75   # quorum-cluster share
/// max_rounds = 3
/// min_responses = 1          # answers required before a score counts
/// strategy = "majority"        # or "weighted", "moderator"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    pub similarity_threshold: f64,
    pub consensus_threshold: f64,
    pub max_rounds: u32,
    pub min_responses: usize,
    pub strategy: String,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        let policy = ConsensusPolicy::default();
        Self {
            similarity_threshold: policy.similarity_threshold,
            consensus_threshold: policy.consensus_threshold,
            max_rounds: policy.max_rounds,
            min_responses: policy.min_responses,
            strategy: SynthesisStrategy::default().as_str().to_string(),
        }
    }
}

impl FileConsensusConfig {
    pub fn to_policy(&self) -> (ConsensusPolicy, Vec<ConfigIssue>) {
        let policy = ConsensusPolicy {
            similarity_threshold: self.similarity_threshold,
            consensus_threshold: self.consensus_threshold,
            max_rounds: self.max_rounds,
            min_responses: self.min_responses,
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

    /// Parse the strategy name; unknown names fall back to `majority`.
    pub fn parse_strategy(&self) -> (SynthesisStrategy, Vec<ConfigIssue>) {
        match self.strategy.parse::<SynthesisStrategy>() {
            Ok(strategy) => (strategy, Vec::new()),
            Err(_) => (
                SynthesisStrategy::default(),
                vec![ConfigIssue::warning(
                    ConfigIssueCode::UnknownStrategy,
                    format!(
                        "consensus.strategy: unknown value '{}', falling back to 'majority'",
                        self.strategy
                    ),
                )],
            ),
        }
    }
}
