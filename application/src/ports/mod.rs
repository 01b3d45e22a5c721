//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod embedding;
pub mod metrics;
pub mod notification;
pub mod progress;
pub mod provider_gateway;
pub mod round_logger;
pub mod ticket_repository;
