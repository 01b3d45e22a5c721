//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`CouncilParams`]: who sits on the council and how agreement is judged
//! - [`DispatchParams`]: round deadline, per-call timeout and grace window
//! - [`EscalationParams`]: rate limit, persistence retries, text caps
//!
//! Domain policies ([`ConsensusPolicy`](council_domain::ConsensusPolicy),
//! [`HealthPolicy`](council_domain::HealthPolicy)) are reused as they are.

pub mod council_params;
pub mod dispatch_params;
pub mod escalation_params;

pub use council_params::CouncilParams;
pub use dispatch_params::DispatchParams;
pub use escalation_params::EscalationParams;
