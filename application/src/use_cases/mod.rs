//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod dispatch_round;
pub mod escalate;
pub mod run_council;
