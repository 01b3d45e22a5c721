//! Ticket repositories
//!
//! Both adapters keep tickets in insertion order, which is also creation
//! order, so `list` returns oldest first without sorting.

mod json_file;
mod memory;

pub use json_file::JsonFileTicketRepository;
pub use memory::InMemoryTicketRepository;

use council_application::RepositoryError;
use council_domain::{EscalationTicket, RequestId, TicketStatus};

fn insert_into(
    tickets: &mut Vec<EscalationTicket>,
    ticket: &EscalationTicket,
) -> Result<(), RepositoryError> {
    if tickets.iter().any(|t| t.id == ticket.id) {
        return Err(RepositoryError::AlreadyExists(ticket.id.clone()));
    }
    tickets.push(ticket.clone());
    Ok(())
}

/// Replace a stored ticket, returning the previous version
fn replace_in(
    tickets: &mut [EscalationTicket],
    ticket: &EscalationTicket,
) -> Result<EscalationTicket, RepositoryError> {
    let slot = tickets
        .iter_mut()
        .find(|t| t.id == ticket.id)
        .ok_or_else(|| RepositoryError::NotFound(ticket.id.clone()))?;
    Ok(std::mem::replace(slot, ticket.clone()))
}

fn pending_of(tickets: &[EscalationTicket], request_id: &RequestId) -> Option<EscalationTicket> {
    tickets
        .iter()
        .find(|t| &t.request_id == request_id && t.is_pending())
        .cloned()
}

fn filter_status(tickets: &[EscalationTicket], status: Option<TicketStatus>) -> Vec<EscalationTicket> {
    tickets
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .cloned()
        .collect()
}
