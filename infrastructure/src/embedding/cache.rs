//! Content-hash embedding cache
//!
//! Shared by every request and read-mostly. Keys are SHA-256 digests of the
//! text; a miss computes through the inner embedder and populates the entry.
//! Two concurrent misses on the same text both compute and write the same
//! vector, which is harmless.

use std::sync::Arc;

use async_trait::async_trait;
use council_application::{Embedder, EmbeddingError};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::trace;

type ContentHash = [u8; 32];

pub struct CachingEmbedder {
    inner: Arc<dyn Embedder>,
    cache: DashMap<ContentHash, Arc<Vec<f32>>>,
}

impl CachingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn key(text: &str) -> ContentHash {
        Sha256::digest(text.as_bytes()).into()
    }
}

#[async_trait]
impl Embedder for CachingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = Self::key(text);
        if let Some(hit) = self.cache.get(&key) {
            trace!("Embedding cache hit");
            return Ok(hit.as_ref().clone());
        }

        // Errors are not cached: the next round retries the service
        let vector = self.inner.embed(text).await?;
        self.cache.insert(key, Arc::new(vector.clone()));
        Ok(vector)
    }
}
