//! Metrics sink emitting `tracing` events.
//!
//! Each signal is an `info` event on [`METRICS_TARGET`] with `metric` and
//! `value` fields and the labels rendered as `key=value` pairs, so a
//! subscriber layer or log pipeline can pick them up by target.

use council_application::{MetricSignal, MetricsSink};
use tracing::info;

pub const METRICS_TARGET: &str = "council::metrics";

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl TracingMetricsSink {
    fn render_labels(signal: &MetricSignal) -> String {
        signal
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl MetricsSink for TracingMetricsSink {
    fn record(&self, signal: MetricSignal) {
        info!(
            target: "council::metrics",
            metric = signal.name,
            value = signal.value,
            labels = %Self::render_labels(&signal),
        );
    }
}
