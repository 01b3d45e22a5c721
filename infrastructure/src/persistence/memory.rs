//! In-memory ticket repository (tickets live for the process lifetime)

use async_trait::async_trait;
use council_application::{RepositoryError, TicketRepository};
use council_domain::{EscalationTicket, RequestId, TicketId, TicketStatus};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<Vec<EscalationTicket>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn insert(&self, ticket: &EscalationTicket) -> Result<(), RepositoryError> {
        super::insert_into(&mut *self.tickets.write().await, ticket)
    }

    async fn update(&self, ticket: &EscalationTicket) -> Result<(), RepositoryError> {
        super::replace_in(&mut self.tickets.write().await, ticket).map(|_| ())
    }

    async fn get(&self, id: &TicketId) -> Result<Option<EscalationTicket>, RepositoryError> {
        Ok(self.tickets.read().await.iter().find(|t| &t.id == id).cloned())
    }

    async fn find_pending(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<EscalationTicket>, RepositoryError> {
        Ok(super::pending_of(&self.tickets.read().await, request_id))
    }

    async fn list(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<EscalationTicket>, RepositoryError> {
        Ok(super::filter_status(&self.tickets.read().await, status))
    }
}
