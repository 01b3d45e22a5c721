//! Ticket repository port
//!
//! Typed persistence for escalation tickets. Every lookup goes through a
//! typed key; no adapter builds queries out of ticket text.

use async_trait::async_trait;
use council_domain::{EscalationTicket, RequestId, TicketId, TicketStatus};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RepositoryError {
    #[error("Ticket not found: {0}")]
    NotFound(TicketId),

    #[error("Ticket already exists: {0}")]
    AlreadyExists(TicketId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Store a new ticket
    async fn insert(&self, ticket: &EscalationTicket) -> Result<(), RepositoryError>;

    /// Replace an existing ticket
    async fn update(&self, ticket: &EscalationTicket) -> Result<(), RepositoryError>;

    async fn get(&self, id: &TicketId) -> Result<Option<EscalationTicket>, RepositoryError>;

    /// The pending ticket of a request, if any
    async fn find_pending(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<EscalationTicket>, RepositoryError>;

    /// All tickets, optionally filtered by status, oldest first
    async fn list(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<EscalationTicket>, RepositoryError>;
}
