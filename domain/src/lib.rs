//! Domain layer for model-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A council is a set of independent model backends ("members") asked the
//! same question. Their answers are compared pairwise and a request reaches
//! consensus when the largest cluster of mutually agreeing answers (the
//! quorum cluster) is a large enough share of the answers received.
//!
//! ## Rounds
//!
//! When the council disagrees, members see their previous answer and are
//! asked again. After the last allowed round the request deadlocks and is
//! escalated to human review.
//!
//! ## Health
//!
//! Each member carries a rolling window of recent call outcomes. Disabled
//! members are not queried until a cooldown has passed since their last
//! failure.

pub mod consensus;
pub mod core;
pub mod escalation;
pub mod health;
pub mod prompt;
pub mod request;

// Re-export commonly used types
pub use consensus::{
    ConsensusPolicy, ConsensusRound, CouncilAnswer, CouncilEscalation, CouncilOutcome,
    MemberParticipation, MemberWeights, QuorumCluster, RoundVerdict, SimilarityMatrix,
    SimilarityMethod, Synthesis, SynthesisPhase, SynthesisStrategy,
};
pub use core::{
    error::DomainError,
    ids::{RequestId, TicketId},
    member::{CouncilMember, MemberId},
    question::{DEFAULT_MAX_QUESTION_CHARS, Question},
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use escalation::{EscalationTicket, SlidingWindowRateLimiter, TicketStatus};
pub use health::{HealthPolicy, HealthRecord, HealthSnapshot, HealthStatus, StatusChange};
pub use prompt::PromptTemplate;
pub use request::{MemberResponse, RequestContext};
