//! Round history and metrics adapters.
//!
//! [`JsonlRoundLogger`] appends the machine-readable round transcript;
//! [`TracingMetricsSink`] turns metric signals into structured `tracing`
//! events.

mod metrics;
mod round_log;

pub use metrics::{METRICS_TARGET, TracingMetricsSink};
pub use round_log::JsonlRoundLogger;
