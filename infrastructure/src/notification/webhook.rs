//! Chat-ops webhook channel

use std::time::Duration;

use async_trait::async_trait;
use council_application::{ChannelKind, NotificationChannel, NotifyError};
use council_domain::EscalationTicket;
use reqwest::Client;
use serde_json::json;

/// Posts `{"text": ..., "ticket": {...}}` to an incoming-webhook URL
pub struct WebhookChannel {
    client: Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Misconfigured(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::ChatOps
    }

    async fn notify(&self, ticket: &EscalationTicket) -> Result<(), NotifyError> {
        let payload = json!({
            "text": super::summary(ticket),
            "ticket": ticket,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_stub;
    use council_domain::RequestId;

    #[tokio::test]
    async fn test_posts_ticket_summary() {
        let mut server = http_stub::serve(200, "{}").await;
        let channel = WebhookChannel::new(format!("{}/hook", server.url), Duration::from_secs(5))
            .unwrap();
        let ticket = EscalationTicket::pending(RequestId::new("req-9"), "max rounds exceeded");

        channel.notify(&ticket).await.unwrap();

        let raw = server.requests.recv().await.unwrap();
        assert!(raw.starts_with("POST /hook"));
        assert!(raw.contains("req-9"));
        assert!(raw.contains("max rounds exceeded"));
    }

    #[tokio::test]
    async fn test_rejected_post_is_delivery_failure() {
        let server = http_stub::serve(500, "{}").await;
        let channel = WebhookChannel::new(server.url.clone(), Duration::from_secs(5)).unwrap();
        let ticket = EscalationTicket::pending(RequestId::new("r"), "x");
        assert!(matches!(
            channel.notify(&ticket).await,
            Err(NotifyError::DeliveryFailed(_))
        ));
    }
}
