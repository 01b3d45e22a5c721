//! Synthesis state machine phases

use serde::{Deserialize, Serialize};

/// Phase of one request in the consensus state machine.
///
/// ```text
/// GATHERING -> ROUND_EVAL -> CONSENSUS   -> SYNTHESIZED
///     ^                   -> NEGOTIATING -> GATHERING
///     |                   -> DEADLOCK    -> ESCALATED
///     +-- (next round) ------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SynthesisPhase {
    Gathering,
    RoundEval,
    Consensus,
    Negotiating,
    Deadlock,
    Synthesized,
    Escalated,
}

impl SynthesisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisPhase::Gathering => "GATHERING",
            SynthesisPhase::RoundEval => "ROUND_EVAL",
            SynthesisPhase::Consensus => "CONSENSUS",
            SynthesisPhase::Negotiating => "NEGOTIATING",
            SynthesisPhase::Deadlock => "DEADLOCK",
            SynthesisPhase::Synthesized => "SYNTHESIZED",
            SynthesisPhase::Escalated => "ESCALATED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SynthesisPhase::Synthesized | SynthesisPhase::Escalated)
    }

    /// Allowed transitions of the state machine.
    ///
    /// `Gathering -> Deadlock` covers a request whose overall deadline ran
    /// out before another round could be gathered.
    pub fn can_transition_to(&self, next: SynthesisPhase) -> bool {
        use SynthesisPhase::*;
        matches!(
            (self, next),
            (Gathering, RoundEval)
                | (Gathering, Deadlock)
                | (RoundEval, Consensus)
                | (RoundEval, Negotiating)
                | (RoundEval, Deadlock)
                | (Consensus, Synthesized)
                | (Negotiating, Gathering)
                | (Negotiating, Deadlock)
                | (Deadlock, Escalated)
        )
    }
}

impl std::fmt::Display for SynthesisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use SynthesisPhase::*;
        assert!(Gathering.can_transition_to(RoundEval));
        assert!(RoundEval.can_transition_to(Consensus));
        assert!(Consensus.can_transition_to(Synthesized));
        assert!(RoundEval.can_transition_to(Negotiating));
        assert!(Negotiating.can_transition_to(Gathering));
        assert!(RoundEval.can_transition_to(Deadlock));
        assert!(Deadlock.can_transition_to(Escalated));
    }

    #[test]
    fn test_terminal_phases_have_no_exit() {
        use SynthesisPhase::*;
        for next in [Gathering, RoundEval, Consensus, Negotiating, Deadlock, Synthesized, Escalated] {
            assert!(!Synthesized.can_transition_to(next));
            assert!(!Escalated.can_transition_to(next));
        }
    }

    #[test]
    fn test_illegal_shortcuts() {
        use SynthesisPhase::*;
        assert!(!Gathering.can_transition_to(Synthesized));
        assert!(!RoundEval.can_transition_to(Gathering));
        assert!(!Consensus.can_transition_to(Escalated));
    }
}
