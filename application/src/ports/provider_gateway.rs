//! Provider gateway port
//!
//! Defines the interface for calling one council member's model backend.

use async_trait::async_trait;
use council_domain::CouncilMember;
use thiserror::Error;

/// Errors that can occur during a provider call
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,
}

impl GatewayError {
    /// Timeouts count as "no response"; everything else is an explicit error
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout)
    }
}

/// One call to one member
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub member: CouncilMember,
    pub system_prompt: String,
    pub prompt: String,
    /// The member's own answer from the previous round, if it gave one
    pub prior_round_context: Option<String>,
}

/// Gateway for model backends
///
/// This port defines how the application layer reaches providers.
/// Implementations (adapters) live in the infrastructure layer.
/// The caller enforces the per-call timeout.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Ask `request.member` for an answer and return its content
    async fn call(&self, request: &ProviderRequest) -> Result<String, GatewayError>;
}
