//! Backend routing for council members

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use council_application::{GatewayError, ProviderGateway, ProviderRequest};
use reqwest::Client;
use tracing::debug;

use super::openai_compat::{OpenAiCompatClient, ProviderEndpoint};

/// [`ProviderGateway`] that sends each member's call to the endpoint named
/// by its `backend`.
pub struct RoutingGateway {
    backends: HashMap<String, OpenAiCompatClient>,
}

impl RoutingGateway {
    /// Build clients sharing one connection pool.
    ///
    /// `request_timeout` is a transport backstop; the dispatcher enforces the
    /// real per-call timeout.
    pub fn new(
        endpoints: impl IntoIterator<Item = (String, ProviderEndpoint)>,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        let backends = endpoints
            .into_iter()
            .map(|(name, endpoint)| (name, OpenAiCompatClient::new(client.clone(), endpoint)))
            .collect();
        Ok(Self { backends })
    }

    pub fn backends(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

#[async_trait]
impl ProviderGateway for RoutingGateway {
    async fn call(&self, request: &ProviderRequest) -> Result<String, GatewayError> {
        let backend = &request.member.backend;
        let client = self
            .backends
            .get(backend)
            .ok_or_else(|| GatewayError::UnknownBackend(backend.clone()))?;
        debug!(member = %request.member.id, backend = %backend, "Calling provider");
        client
            .complete(
                &request.system_prompt,
                &request.prompt,
                request.prior_round_context.as_deref(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_stub;
    use council_domain::CouncilMember;

    fn request(backend: &str) -> ProviderRequest {
        ProviderRequest {
            member: CouncilMember::new("m", backend),
            system_prompt: "system".to_string(),
            prompt: "prompt".to_string(),
            prior_round_context: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let gateway = RoutingGateway::new(Vec::new(), Duration::from_secs(5)).unwrap();
        let err = gateway.call(&request("ghost")).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownBackend(ref b) if b == "ghost"));
    }

    #[tokio::test]
    async fn test_routes_by_backend_name() {
        let server = http_stub::serve(
            200,
            r#"{"choices":[{"message":{"content":"from local"}}]}"#,
        )
        .await;
        let gateway = RoutingGateway::new(
            [(
                "local".to_string(),
                ProviderEndpoint::new(server.url.clone(), "llama"),
            )],
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(gateway.call(&request("local")).await.unwrap(), "from local");
        assert_eq!(gateway.backends().collect::<Vec<_>>(), vec!["local"]);
    }
}
