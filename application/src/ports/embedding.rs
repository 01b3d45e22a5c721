//! Embedding port
//!
//! Turns answer text into vectors for cosine agreement scoring.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EmbeddingError {
    #[error("Embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Embedding collaborator
///
/// Implementations may cache by content hash; a miss computes the vector
/// and populates the cache.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
