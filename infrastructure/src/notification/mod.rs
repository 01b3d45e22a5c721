//! Notification channel adapters
//!
//! Delivery mechanics beyond these hand-offs (SMTP, chat platforms) stay
//! outside the process.

mod email;
mod log;
mod webhook;

pub use email::EmailOutboxChannel;
pub use log::LogChannel;
pub use webhook::WebhookChannel;

use std::sync::Arc;
use std::time::Duration;

use council_application::{ChannelKind, NotificationRouter, NotifyError};
use council_domain::EscalationTicket;

use crate::config::FileChannelConfig;

/// Build the router from `[[escalation.channels]]`.
///
/// With no channel configured, tickets are still announced in the log.
pub fn router_from_config(channels: &[FileChannelConfig]) -> Result<NotificationRouter, NotifyError> {
    let mut router = NotificationRouter::new();
    for channel in channels {
        match channel.kind {
            ChannelKind::Log => router.register(Arc::new(LogChannel)),
            ChannelKind::ChatOps => {
                let url = channel.url.clone().ok_or_else(|| {
                    NotifyError::Misconfigured("chat_ops channel requires url".to_string())
                })?;
                router.register(Arc::new(WebhookChannel::new(url, Duration::from_secs(10))?));
            }
            ChannelKind::Email => {
                let dir = channel.outbox_dir.clone().ok_or_else(|| {
                    NotifyError::Misconfigured("email channel requires outbox_dir".to_string())
                })?;
                router.register(Arc::new(EmailOutboxChannel::new(dir, channel.to.clone())));
            }
        }
    }
    if router.is_empty() {
        router.register(Arc::new(LogChannel));
    }
    Ok(router)
}

/// One-line human summary shared by every channel
fn summary(ticket: &EscalationTicket) -> String {
    format!(
        "Council escalation {} for request {}: {}",
        ticket.id, ticket.request_id, ticket.reason
    )
}
