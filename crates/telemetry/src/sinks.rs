// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_error_sink(),
        None => &NOP_SINK,
    }
}

/// Returns a static reference to the configured observer metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn observer_metrics() -> &'static dyn ObserverMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_observer_sink(),
        None => &NOP_SINK,
    }
}

// --- Trait Definitions ---

/// A sink for metrics describing report cycles and their outcomes.
pub trait ObserverMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for reports assembled.
    fn inc_reports_generated(&self);
    /// Observes the duration of one report cycle.
    fn observe_cycle_duration(&self, duration_secs: f64);
    /// Increments a counter for gateway assessments, labeled by outcome.
    fn inc_gateway_assessments(&self, outcome: &'static str);
    /// Increments a counter for name assessments, labeled by outcome.
    fn inc_name_assessments(&self, outcome: &'static str);
    /// Increments a counter for cycles that did not publish, labeled by reason.
    fn inc_publish_skips(&self, reason: &'static str);
    /// Increments a counter for successful sink saves, labeled by sink name.
    fn inc_sink_saves(&self, sink: &str);
    /// Increments a counter for failed sink saves, labeled by sink name.
    fn inc_sink_failures(&self, sink: &str);
}
impl ObserverMetricsSink for NopSink {
    fn inc_reports_generated(&self) {}
    fn observe_cycle_duration(&self, _duration_secs: f64) {}
    fn inc_gateway_assessments(&self, _outcome: &'static str) {}
    fn inc_name_assessments(&self, _outcome: &'static str) {}
    fn inc_publish_skips(&self, _reason: &'static str) {}
    fn inc_sink_saves(&self, _sink: &str) {}
    fn inc_sink_failures(&self, _sink: &str) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink: ObserverMetricsSink + ErrorMetricsSink {
    /// Views the sink as its observer half.
    fn as_observer_sink(&self) -> &dyn ObserverMetricsSink;
    /// Views the sink as its error half.
    fn as_error_sink(&self) -> &dyn ErrorMetricsSink;
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T
where
    T: ObserverMetricsSink + ErrorMetricsSink,
{
    fn as_observer_sink(&self) -> &dyn ObserverMetricsSink {
        self
    }
    fn as_error_sink(&self) -> &dyn ErrorMetricsSink {
        self
    }
}
