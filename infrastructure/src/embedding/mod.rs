//! Embedding adapters

mod cache;
mod http_client;

pub use cache::CachingEmbedder;
pub use http_client::HttpEmbeddingClient;
