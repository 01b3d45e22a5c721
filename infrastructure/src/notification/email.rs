//! Email hand-off channel
//!
//! Renders each ticket as an RFC 5322 message into an outbox directory that
//! an external mailer drains. Files appear atomically (temp file + rename).

use std::path::PathBuf;

use async_trait::async_trait;
use council_application::{ChannelKind, NotificationChannel, NotifyError};
use council_domain::EscalationTicket;

const SENDER: &str = "model-council@localhost";

pub struct EmailOutboxChannel {
    outbox: PathBuf,
    recipients: Vec<String>,
}

impl EmailOutboxChannel {
    pub fn new(outbox: impl Into<PathBuf>, recipients: Vec<String>) -> Self {
        Self {
            outbox: outbox.into(),
            recipients,
        }
    }

    fn render(&self, ticket: &EscalationTicket) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: [council] Escalation {}\r\nDate: {}\r\n\r\n{}\r\n\r\nCreated: {}\r\nStatus: {}\r\n",
            SENDER,
            self.recipients.join(", "),
            ticket.request_id,
            ticket.created_at.to_rfc2822(),
            super::summary(ticket),
            ticket.created_at.to_rfc3339(),
            ticket.status.as_str(),
        )
    }
}

#[async_trait]
impl NotificationChannel for EmailOutboxChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn notify(&self, ticket: &EscalationTicket) -> Result<(), NotifyError> {
        if self.recipients.is_empty() {
            return Err(NotifyError::Misconfigured(
                "email channel has no recipients".to_string(),
            ));
        }
        let failed = |e: std::io::Error| NotifyError::DeliveryFailed(e.to_string());

        tokio::fs::create_dir_all(&self.outbox).await.map_err(failed)?;
        let final_path = self.outbox.join(format!("{}.eml", ticket.id));
        let tmp_path = self.outbox.join(format!(".{}.eml.tmp", ticket.id));
        tokio::fs::write(&tmp_path, self.render(ticket))
            .await
            .map_err(failed)?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::RequestId;

    #[tokio::test]
    async fn test_writes_message_to_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = dir.path().join("outbox");
        let channel = EmailOutboxChannel::new(&outbox, vec!["ops@example.com".to_string()]);
        let ticket = EscalationTicket::pending(RequestId::new("req-1"), "max rounds exceeded");

        channel.notify(&ticket).await.unwrap();

        let message =
            std::fs::read_to_string(outbox.join(format!("{}.eml", ticket.id))).unwrap();
        assert!(message.contains("To: ops@example.com"));
        assert!(message.contains("Subject: [council] Escalation req-1"));
        assert!(message.contains("Status: pending"));
        assert_eq!(std::fs::read_dir(&outbox).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_no_recipients_is_misconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let channel = EmailOutboxChannel::new(dir.path(), Vec::new());
        let ticket = EscalationTicket::pending(RequestId::new("r"), "x");
        assert!(matches!(
            channel.notify(&ticket).await,
            Err(NotifyError::Misconfigured(_))
        ));
    }
}
