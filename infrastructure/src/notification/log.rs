//! Log channel: announces tickets through `tracing`

use async_trait::async_trait;
use council_application::{ChannelKind, NotificationChannel, NotifyError};
use council_domain::EscalationTicket;
use tracing::warn;

pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Log
    }

    async fn notify(&self, ticket: &EscalationTicket) -> Result<(), NotifyError> {
        warn!(
            target: "council::escalation",
            ticket = %ticket.id,
            request_id = %ticket.request_id,
            "{}",
            super::summary(ticket)
        );
        Ok(())
    }
}
