//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No council members configured")]
    NoMembers,

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid member: {0}")]
    InvalidMember(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Illegal phase transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Round {expected} is no longer current (now {actual})")]
    StaleRound { expected: u32, actual: u32 },

    #[error("Round {0} already finalized")]
    RoundAlreadyFinalized(u32),

    #[error("Request already terminal")]
    RequestTerminal,

    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

impl DomainError {
    /// Whether this error rejects the caller's input (fatal to one request only)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::NoMembers
                | DomainError::InvalidQuestion(_)
                | DomainError::InvalidMember(_)
                | DomainError::InvalidConfig(_)
        )
    }
}
