//! Council parameters: membership, agreement policy and synthesis.

use std::time::Duration;

use council_domain::{
    ConsensusPolicy, CouncilMember, DEFAULT_MAX_QUESTION_CHARS, DomainError, MemberId,
    MemberWeights, SynthesisStrategy,
};
use serde::{Deserialize, Serialize};

/// Static parameters of a council request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilParams {
    /// Configured members (disabled ones included; the pool skips them).
    pub members: Vec<CouncilMember>,
    pub consensus: ConsensusPolicy,
    pub strategy: SynthesisStrategy,
    /// Member that composes the answer under the `moderator` strategy.
    pub moderator: Option<MemberId>,
    /// Show peers' previous answers in negotiation prompts.
    pub share_peer_answers: bool,
    /// Overall budget of one request across all rounds.
    pub request_timeout: Duration,
    /// Longest accepted question, in characters.
    pub max_query_chars: usize,
}

impl Default for CouncilParams {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            consensus: ConsensusPolicy::default(),
            strategy: SynthesisStrategy::default(),
            moderator: None,
            share_peer_answers: false,
            request_timeout: Duration::from_secs(300),
            max_query_chars: DEFAULT_MAX_QUESTION_CHARS,
        }
    }
}

impl CouncilParams {
    pub fn new(members: Vec<CouncilMember>) -> Self {
        Self {
            members,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: SynthesisStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_moderator(mut self, moderator: impl Into<MemberId>) -> Self {
        self.moderator = Some(moderator.into());
        self
    }

    pub fn with_consensus(mut self, consensus: ConsensusPolicy) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.consensus.max_rounds = max_rounds;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_query_chars(mut self, max_chars: usize) -> Self {
        self.max_query_chars = max_chars;
        self
    }

    pub fn with_peer_answers(mut self, share: bool) -> Self {
        self.share_peer_answers = share;
        self
    }

    pub fn enabled_members(&self) -> impl Iterator<Item = &CouncilMember> {
        self.members.iter().filter(|m| m.enabled)
    }

    pub fn member(&self, id: &MemberId) -> Option<&CouncilMember> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub fn weights(&self) -> MemberWeights {
        self.members
            .iter()
            .map(|m| (m.id.clone(), m.weight))
            .collect()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.enabled_members().next().is_none() {
            return Err(DomainError::NoMembers);
        }
        for member in &self.members {
            member.validate()?;
        }
        self.consensus.validate()?;
        if self.strategy == SynthesisStrategy::Moderator {
            match &self.moderator {
                None => {
                    return Err(DomainError::InvalidConfig(
                        "moderator strategy requires council.moderator".to_string(),
                    ));
                }
                Some(id) if self.member(id).is_none() => {
                    return Err(DomainError::InvalidConfig(format!(
                        "moderator '{}' is not a council member",
                        id
                    )));
                }
                Some(_) => {}
            }
        }
        if self.request_timeout.is_zero() {
            return Err(DomainError::InvalidConfig(
                "council.request_timeout must be positive".to_string(),
            ));
        }
        if self.max_query_chars == 0 {
            return Err(DomainError::InvalidConfig(
                "council.max_query_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<CouncilMember> {
        vec![
            CouncilMember::new("a", "openai"),
            CouncilMember::new("b", "local").with_weight(2.0),
        ]
    }

    #[test]
    fn test_no_enabled_members() {
        let params = CouncilParams::new(vec![CouncilMember::new("a", "openai").disabled()]);
        assert_eq!(params.validate(), Err(DomainError::NoMembers));
    }

    #[test]
    fn test_moderator_must_be_member() {
        let params = CouncilParams::new(members()).with_strategy(SynthesisStrategy::Moderator);
        assert!(params.validate().is_err());

        let params = params.with_moderator("zzz");
        assert!(params.validate().is_err());

        let params = params.with_moderator("b");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_weights() {
        let weights = CouncilParams::new(members()).weights();
        assert_eq!(weights.of(&MemberId::new("b")), 2.0);
        assert_eq!(weights.of(&MemberId::new("unknown")), 1.0);
    }
}
