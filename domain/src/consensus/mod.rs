//! Consensus domain
//!
//! Everything the synthesizer needs to judge a round without I/O:
//! the phase machine, pairwise similarity, the quorum graph, round verdicts,
//! synthesis strategies and the terminal outcomes.

pub mod outcome;
pub mod participation;
pub mod phase;
pub mod quorum;
pub mod round;
pub mod similarity;
pub mod strategy;

pub use outcome::{CouncilAnswer, CouncilEscalation, CouncilOutcome};
pub use participation::MemberParticipation;
pub use phase::SynthesisPhase;
pub use quorum::{ConsensusPolicy, QuorumCluster, RoundVerdict, quorum_cluster};
pub use round::ConsensusRound;
pub use similarity::{SimilarityMatrix, SimilarityMethod, cosine_similarity, lexical_similarity};
pub use strategy::{MemberWeights, Synthesis, SynthesisStrategy};
