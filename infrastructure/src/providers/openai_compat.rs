//! OpenAI-compatible chat completions client

use council_application::GatewayError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transport_error;

/// One configured backend
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoint {
    /// Base URL up to (not including) `/chat/completions`
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatClient {
    client: Client,
    endpoint: ProviderEndpoint,
}

impl OpenAiCompatClient {
    pub fn new(client: Client, endpoint: ProviderEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &ProviderEndpoint {
        &self.endpoint
    }

    /// Send one completion.
    ///
    /// `prior_answer` is replayed as the assistant turn preceding the prompt.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        prior_answer: Option<&str>,
    ) -> Result<String, GatewayError> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: system,
        }];
        if let Some(prior) = prior_answer {
            messages.push(ChatMessage {
                role: "assistant",
                content: prior,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatRequest {
            model: &self.endpoint.model,
            messages,
            max_tokens: self.endpoint.max_tokens,
            temperature: self.endpoint.temperature,
        };

        let mut request = self.client.post(self.endpoint.completions_url()).json(&body);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::ProviderError(format!(
                "{} returned {}: {}",
                self.endpoint.model,
                status,
                error_text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(transport_error)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("no choices in response".to_string()))?;
        debug!(model = %self.endpoint.model, chars = content.len(), "Completion received");
        Ok(content)
    }
}
