// Path: crates/observer/src/pipeline/mod.rs
//! The ordered publish pipeline and its sinks.

/// Filesystem report store.
pub mod fs_store;
/// Ledger observation sink.
pub mod ledger_sink;
/// Signed, gzipped report upload sink.
pub mod upload_sink;

pub use fs_store::FsReportStore;
pub use ledger_sink::LedgerReportSink;
pub use upload_sink::UploadReportSink;

use async_trait::async_trait;
use observer_api::publish::ReportSink;
use observer_telemetry::{error_metrics, observer_metrics};
use observer_types::prelude::*;
use observer_types::report::ReportInfo;
use std::sync::Arc;

/// Tag name identifying this application on uploads and interactions.
pub const APP_NAME_TAG: &str = "App-Name";
/// The application name written in [`APP_NAME_TAG`].
pub const APP_NAME: &str = "AR-IO Observer";
/// Tag name carrying the epoch start height.
pub const EPOCH_START_HEIGHT_TAG: &str = "AR-IO-Epoch-Start-Height";

/// A sink with the name it is logged and counted under.
pub struct NamedSink {
    name: String,
    sink: Arc<dyn ReportSink>,
}

impl NamedSink {
    /// Names `sink`.
    pub fn new(name: impl Into<String>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }
}

/// Runs sinks strictly in order, threading each returned [`ReportInfo`] into
/// the next.
///
/// A failing sink is logged and counted; the next sink receives the last
/// good info. The pipeline itself never fails.
pub struct PipelineReportSink {
    sinks: Vec<NamedSink>,
}

impl PipelineReportSink {
    /// Builds the pipeline from sinks in execution order.
    pub fn new(sinks: Vec<NamedSink>) -> Self {
        Self { sinks }
    }
}

/// Wraps a sink's error so the log names the sink that failed.
fn sink_failure(name: &str, error: &ObserverError) -> ObserverError {
    ObserverError::SinkFailed {
        sink: name.to_string(),
        reason: error.to_string(),
    }
}

#[async_trait]
impl ReportSink for PipelineReportSink {
    async fn save_report(&self, info: ReportInfo) -> Result<ReportInfo> {
        let epoch_start_height = info.report.epoch_start_height;
        tracing::debug!(target: "pipeline", epoch_start_height, "saving report");

        let mut last = info;
        for NamedSink { name, sink } in &self.sinks {
            match sink.save_report(last.clone()).await {
                Ok(next) => {
                    observer_metrics().inc_sink_saves(name);
                    last = next;
                }
                Err(e) => {
                    error_metrics().inc_error("sink", e.code());
                    let failure = sink_failure(name, &e);
                    tracing::error!(
                        target: "pipeline",
                        sink = %name,
                        epoch_start_height,
                        code = failure.code(),
                        error = %failure,
                        "sink failed, continuing with the last saved report"
                    );
                    observer_metrics().inc_sink_failures(name);
                }
            }
        }

        tracing::debug!(target: "pipeline", epoch_start_height, "report saved");
        Ok(last)
    }
}
