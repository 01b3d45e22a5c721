//! Terminal outcomes of a council request

use serde::{Deserialize, Serialize};

use super::participation::MemberParticipation;
use super::phase::SynthesisPhase;
use super::round::ConsensusRound;
use super::strategy::SynthesisStrategy;
use crate::core::ids::RequestId;
use crate::core::member::MemberId;
use crate::escalation::ticket::EscalationTicket;

/// The council agreed: one synthesized answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilAnswer {
    pub request_id: RequestId,
    pub question: String,
    pub content: String,
    /// Strategy that actually produced `content` (after any fallback)
    pub strategy: SynthesisStrategy,
    pub cited: Vec<MemberId>,
    pub score: f64,
    pub rounds: Vec<ConsensusRound>,
    pub participation: Vec<MemberParticipation>,
}

/// The council deadlocked and the request went to human review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilEscalation {
    pub request_id: RequestId,
    pub question: String,
    pub reason: String,
    /// Score of the last evaluated round (0 when none was evaluated)
    pub score: f64,
    pub ticket: EscalationTicket,
    /// False when the ticket could not be persisted and is only held in memory
    pub persisted: bool,
    pub rounds: Vec<ConsensusRound>,
    pub participation: Vec<MemberParticipation>,
}

/// What a request ended in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CouncilOutcome {
    Synthesized(CouncilAnswer),
    Escalated(CouncilEscalation),
}

impl CouncilOutcome {
    pub fn phase(&self) -> SynthesisPhase {
        match self {
            CouncilOutcome::Synthesized(_) => SynthesisPhase::Synthesized,
            CouncilOutcome::Escalated(_) => SynthesisPhase::Escalated,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        match self {
            CouncilOutcome::Synthesized(a) => &a.request_id,
            CouncilOutcome::Escalated(e) => &e.request_id,
        }
    }

    pub fn rounds(&self) -> &[ConsensusRound] {
        match self {
            CouncilOutcome::Synthesized(a) => &a.rounds,
            CouncilOutcome::Escalated(e) => &e.rounds,
        }
    }

    /// Number of rounds evaluated
    pub fn rounds_used(&self) -> usize {
        self.rounds().len()
    }

    pub fn participation(&self) -> &[MemberParticipation] {
        match self {
            CouncilOutcome::Synthesized(a) => &a.participation,
            CouncilOutcome::Escalated(e) => &e.participation,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            CouncilOutcome::Synthesized(a) => a.score,
            CouncilOutcome::Escalated(e) => e.score,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, CouncilOutcome::Synthesized(_))
    }

    pub fn as_answer(&self) -> Option<&CouncilAnswer> {
        match self {
            CouncilOutcome::Synthesized(a) => Some(a),
            CouncilOutcome::Escalated(_) => None,
        }
    }

    pub fn as_escalation(&self) -> Option<&CouncilEscalation> {
        match self {
            CouncilOutcome::Synthesized(_) => None,
            CouncilOutcome::Escalated(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalated_outcome_accessors() {
        let outcome = CouncilOutcome::Escalated(CouncilEscalation {
            request_id: RequestId::new("req-9"),
            question: "q".to_string(),
            reason: "max rounds exceeded, score=0.33".to_string(),
            score: 0.33,
            ticket: EscalationTicket::pending(RequestId::new("req-9"), "max rounds exceeded"),
            persisted: true,
            rounds: Vec::new(),
            participation: Vec::new(),
        });
        assert_eq!(outcome.phase(), SynthesisPhase::Escalated);
        assert!(!outcome.is_synthesized());
        assert!(outcome.as_answer().is_none());
        assert_eq!(outcome.request_id().as_str(), "req-9");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "escalated");
        assert_eq!(json["ticket"]["status"], "pending");
    }
}
