//! Infrastructure layer for model-council
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod embedding;
pub mod logging;
pub mod notification;
pub mod persistence;
pub mod providers;

#[cfg(test)]
pub(crate) mod http_stub;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig, FileOutputFormat};
pub use embedding::{CachingEmbedder, HttpEmbeddingClient};
pub use logging::{JsonlRoundLogger, TracingMetricsSink};
pub use notification::{EmailOutboxChannel, LogChannel, WebhookChannel, router_from_config};
pub use persistence::{InMemoryTicketRepository, JsonFileTicketRepository};
pub use providers::{ProviderEndpoint, RoutingGateway};
