//! Observability: reconcile telemetry (metrics) and sink abstractions.
//!
//! Structured debug logging goes through `tracing` at the call sites;
//! counters flow exclusively through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
