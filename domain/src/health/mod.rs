//! Member health domain
//!
//! A [`HealthRecord`] is a bounded rolling window of recent call outcomes
//! for one member; its [`HealthStatus`] is derived from the window's success
//! rate under a [`HealthPolicy`] with upgrade hysteresis.

pub mod record;
pub mod status;

pub use record::{HealthPolicy, HealthRecord, HealthSnapshot, StatusChange};
pub use status::HealthStatus;
