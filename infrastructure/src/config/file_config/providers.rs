//! Provider endpoints from TOML (`[providers.<name>]` sections)
//!
//! Each member's `backend` names one entry. Every entry speaks the
//! OpenAI-compatible chat completions protocol.
//!
//! ```toml
//! [providers.openai]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [providers.local]
//! base_url = "http://localhost:11434/v1"
//! model = "llama3.1"
//! ```

use serde::{Deserialize, Serialize};

use crate::providers::ProviderEndpoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl FileProviderConfig {
    /// The API key, read from the environment when configured that way
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }

    pub fn to_endpoint(&self) -> ProviderEndpoint {
        let mut endpoint =
            ProviderEndpoint::new(self.base_url.trim(), self.model.trim()).with_api_key(self.resolve_api_key());
        endpoint.max_tokens = self.max_tokens;
        endpoint.temperature = self.temperature;
        endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> FileProviderConfig {
        FileProviderConfig {
            base_url: " http://localhost:11434/v1 ".to_string(),
            model: "llama3.1".to_string(),
            api_key_env: None,
            api_key: None,
            max_tokens: Some(512),
            temperature: None,
        }
    }

    #[test]
    fn test_direct_key_wins_over_env() {
        let mut config = provider();
        config.api_key_env = Some("MODEL_COUNCIL_TEST_UNSET_KEY".to_string());
        assert_eq!(config.resolve_api_key(), None);

        config.api_key = Some("sk-direct".to_string());
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-direct"));
    }

    #[test]
    fn test_to_endpoint() {
        let endpoint = provider().to_endpoint();
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert_eq!(endpoint.model, "llama3.1");
        assert_eq!(endpoint.max_tokens, Some(512));
        assert!(endpoint.api_key.is_none());
    }
}
