//! Notification channel port
//!
//! Channels are registered under a [`ChannelKind`] and looked up by that
//! tag; every channel honours the same `notify(ticket)` contract. Delivery
//! mechanics (SMTP, chat APIs) live behind the adapters.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use council_domain::EscalationTicket;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Channel misconfigured: {0}")]
    Misconfigured(String),
}

/// Capability tag of a notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    ChatOps,
    Log,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::ChatOps => "chat_ops",
            ChannelKind::Log => "log",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Tell reviewers about a new pending ticket
    async fn notify(&self, ticket: &EscalationTicket) -> Result<(), NotifyError>;
}

/// Registry of notification channels keyed by capability
#[derive(Default, Clone)]
pub struct NotificationRouter {
    channels: BTreeMap<ChannelKind, Vec<Arc<dyn NotificationChannel>>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels.entry(channel.kind()).or_default().push(channel);
    }

    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.register(channel);
        self
    }

    /// Channels registered for `kind`
    pub fn channels(&self, kind: ChannelKind) -> &[Arc<dyn NotificationChannel>] {
        self.channels.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.channels.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.values().all(Vec::is_empty)
    }

    /// Deliver `ticket` to every registered channel.
    ///
    /// Failures are logged and counted; they never affect the ticket.
    /// Returns the number of channels that failed.
    pub async fn deliver(&self, ticket: &EscalationTicket) -> usize {
        let mut failures = 0;
        for (kind, channels) in &self.channels {
            for channel in channels {
                match channel.notify(ticket).await {
                    Ok(()) => debug!(ticket = %ticket.id, channel = %kind, "Notification delivered"),
                    Err(e) => {
                        failures += 1;
                        warn!(ticket = %ticket.id, channel = %kind, "Notification failed: {}", e);
                    }
                }
            }
        }
        failures
    }
}
