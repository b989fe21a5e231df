// Path: crates/observer/src/driver.rs
//! The periodic build-then-maybe-publish cycle.

use crate::report::ReportBuilder;
use crate::scheduler::{PublishDecision, PublishScheduler, SkipReason};
use observer_api::publish::ReportSink;
use observer_telemetry::time::CycleTimer;
use observer_telemetry::{error_metrics, observer_metrics};
use observer_types::prelude::*;
use observer_types::report::ReportInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The report went through the pipeline.
    Published(ReportInfo),
    /// The report was built but not published.
    Skipped(SkipReason),
}

/// Owns the report builder, the publish scheduler and the pipeline.
pub struct ObserverDriver {
    builder: ReportBuilder,
    scheduler: PublishScheduler,
    pipeline: Arc<dyn ReportSink>,
}

impl ObserverDriver {
    /// Wires the driver.
    pub fn new(
        builder: ReportBuilder,
        scheduler: PublishScheduler,
        pipeline: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            builder,
            scheduler,
            pipeline,
        }
    }

    /// Runs one cycle.
    ///
    /// Errors are cycle-fatal setup failures (epoch, entropy, name lists,
    /// observer list or height). Publish skips are outcomes, not errors.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let _timer = CycleTimer::new(observer_metrics());
        let report = self.builder.generate_report().await?;
        let epoch_index = report.epoch_index;
        match self.scheduler.decide(&report).await? {
            PublishDecision::Skip(reason) => {
                tracing::info!(target: "driver", epoch_index, reason = ?reason, "skipping publish");
                observer_metrics().inc_publish_skips(reason.label());
                Ok(CycleOutcome::Skipped(reason))
            }
            PublishDecision::Publish => {
                tracing::info!(target: "driver", epoch_index, "publishing report");
                let info = self.pipeline.save_report(ReportInfo::new(report)).await?;
                Ok(CycleOutcome::Published(info))
            }
        }
    }

    /// Runs a cycle every `period` until `shutdown` flips to `true`.
    ///
    /// A failed cycle is logged and counted; the next tick tries again.
    pub async fn run_forever(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(target: "driver", period_secs = period.as_secs(), "observer loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(target: "driver", error = %e, code = e.code(), "report cycle failed");
                        error_metrics().inc_error("cycle", e.code());
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(target: "driver", "observer loop stopped");
    }
}
