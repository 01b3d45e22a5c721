//! Application layer for model-council
//!
//! This crate contains use cases, port definitions, the provider health pool
//! and application configuration. It depends only on the domain layer.

pub mod config;
pub mod health_pool;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{CouncilParams, DispatchParams, EscalationParams};
pub use health_pool::ProviderHealthPool;
pub use ports::{
    embedding::{Embedder, EmbeddingError},
    metrics::{MetricSignal, MetricsSink, NoMetrics},
    notification::{ChannelKind, NotificationChannel, NotificationRouter, NotifyError},
    progress::{NoProgress, ProgressNotifier},
    provider_gateway::{GatewayError, ProviderGateway, ProviderRequest},
    round_logger::{NoRoundLogger, RoundEvent, RoundLogger},
    ticket_repository::{RepositoryError, TicketRepository},
};
pub use use_cases::dispatch_round::{
    DispatchError, RequestDispatcher, RoundReport, RoundRequest,
};
pub use use_cases::escalate::{EscalationError, EscalationGate};
pub use use_cases::run_council::{RunCouncilError, RunCouncilInput, RunCouncilUseCase};
