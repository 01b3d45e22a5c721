//! Embedding service from TOML (`[embedding]` section)
//!
//! Without an enabled embedding service every round is scored lexically.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEmbeddingConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    /// Cache vectors by content hash for the process lifetime
    pub cache: bool,
}

impl Default for FileEmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            timeout_secs: 30,
            cache: true,
        }
    }
}

impl FileEmbeddingConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}
