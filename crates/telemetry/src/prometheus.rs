// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter, register_int_counter_vec,
    Histogram, IntCounter, IntCounterVec,
};

// --- Metric Statics ---
// Collectors are set exactly once by `install`.

static REPORTS_GENERATED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static CYCLE_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static GATEWAY_ASSESSMENTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static NAME_ASSESSMENTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static PUBLISH_SKIPS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SINK_SAVES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SINK_FAILURES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed [`MetricsSink`].
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// Recording is skipped when `install()` has not been called.
macro_rules! get_metric {
    ($metric:ident) => {
        match $metric.get() {
            Some(metric) => metric,
            None => return,
        }
    };
}

impl ObserverMetricsSink for PrometheusSink {
    fn inc_reports_generated(&self) {
        get_metric!(REPORTS_GENERATED_TOTAL).inc();
    }
    fn observe_cycle_duration(&self, duration_secs: f64) {
        get_metric!(CYCLE_DURATION_SECONDS).observe(duration_secs);
    }
    fn inc_gateway_assessments(&self, outcome: &'static str) {
        get_metric!(GATEWAY_ASSESSMENTS_TOTAL)
            .with_label_values(&[outcome])
            .inc();
    }
    fn inc_name_assessments(&self, outcome: &'static str) {
        get_metric!(NAME_ASSESSMENTS_TOTAL)
            .with_label_values(&[outcome])
            .inc();
    }
    fn inc_publish_skips(&self, reason: &'static str) {
        get_metric!(PUBLISH_SKIPS_TOTAL)
            .with_label_values(&[reason])
            .inc();
    }
    fn inc_sink_saves(&self, sink: &str) {
        get_metric!(SINK_SAVES_TOTAL).with_label_values(&[sink]).inc();
    }
    fn inc_sink_failures(&self, sink: &str) {
        get_metric!(SINK_FAILURES_TOTAL)
            .with_label_values(&[sink])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

fn set_once<T>(cell: &OnceCell<T>, value: T, name: &str) -> Result<(), prometheus::Error> {
    cell.set(value)
        .map_err(|_| prometheus::Error::Msg(format!("metric {name} already installed")))
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    set_once(
        &REPORTS_GENERATED_TOTAL,
        register_int_counter!(
            "observer_reports_generated_total",
            "Total number of observer reports assembled."
        )?,
        "observer_reports_generated_total",
    )?;
    set_once(
        &CYCLE_DURATION_SECONDS,
        register_histogram!(
            "observer_cycle_duration_seconds",
            "Duration of one report generation and publish cycle.",
            exponential_buckets(1.0, 2.0, 14)?
        )?,
        "observer_cycle_duration_seconds",
    )?;
    set_once(
        &GATEWAY_ASSESSMENTS_TOTAL,
        register_int_counter_vec!(
            "observer_gateway_assessments_total",
            "Total gateway assessments, labeled by outcome.",
            &["outcome"]
        )?,
        "observer_gateway_assessments_total",
    )?;
    set_once(
        &NAME_ASSESSMENTS_TOTAL,
        register_int_counter_vec!(
            "observer_name_assessments_total",
            "Total name assessments, labeled by outcome.",
            &["outcome"]
        )?,
        "observer_name_assessments_total",
    )?;
    set_once(
        &PUBLISH_SKIPS_TOTAL,
        register_int_counter_vec!(
            "observer_publish_skips_total",
            "Total cycles that did not publish, labeled by reason.",
            &["reason"]
        )?,
        "observer_publish_skips_total",
    )?;
    set_once(
        &SINK_SAVES_TOTAL,
        register_int_counter_vec!(
            "observer_sink_saves_total",
            "Total successful report sink saves.",
            &["sink"]
        )?,
        "observer_sink_saves_total",
    )?;
    set_once(
        &SINK_FAILURES_TOTAL,
        register_int_counter_vec!(
            "observer_sink_failures_total",
            "Total failed report sink saves.",
            &["sink"]
        )?,
        "observer_sink_failures_total",
    )?;
    set_once(
        &ERRORS_TOTAL,
        register_int_counter_vec!(
            "observer_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?,
        "observer_errors_total",
    )?;

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
