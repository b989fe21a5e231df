// Path: crates/observer/src/pipeline/upload_sink.rs
//! Uploads the report as a signed, gzipped JSON payload.

use super::{APP_NAME, APP_NAME_TAG, EPOCH_START_HEIGHT_TAG};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use observer_api::publish::{ReportSigner, ReportSink, Tag, UploadClient, UploadItem};
use observer_telemetry::error_metrics;
use observer_types::prelude::*;
use observer_types::report::{ObserverReport, ReportInfo};
use std::io::Write;
use std::sync::Arc;

/// Tag name carrying the epoch index.
pub const EPOCH_INDEX_TAG: &str = "AR-IO-Epoch-Index";

/// Uploads each epoch's report at most once and records its id in
/// [`ReportInfo::report_tx_id`].
pub struct UploadReportSink {
    uploads: Arc<dyn UploadClient>,
    signer: Arc<dyn ReportSigner>,
    app_version: String,
}

impl UploadReportSink {
    /// Builds the sink. `app_version` is written to the `App-Version` tag.
    pub fn new(
        uploads: Arc<dyn UploadClient>,
        signer: Arc<dyn ReportSigner>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            uploads,
            signer,
            app_version: app_version.into(),
        }
    }

    fn lookup_tags(report: &ObserverReport) -> Vec<Tag> {
        vec![
            Tag::new(APP_NAME_TAG, APP_NAME),
            Tag::new(EPOCH_START_HEIGHT_TAG, report.epoch_start_height.to_string()),
        ]
    }

    fn upload_tags(&self, report: &ObserverReport) -> Vec<Tag> {
        vec![
            Tag::new(APP_NAME_TAG, APP_NAME),
            Tag::new("App-Version", self.app_version.as_str()),
            Tag::new("Content-Type", "application/json"),
            Tag::new("Content-Encoding", "gzip"),
            Tag::new(EPOCH_START_HEIGHT_TAG, report.epoch_start_height.to_string()),
            Tag::new(EPOCH_INDEX_TAG, report.epoch_index.to_string()),
        ]
    }
}

/// Serializes `report` to JSON and gzips it.
pub fn gzip_report(report: &ObserverReport) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(report)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

#[async_trait]
impl ReportSink for UploadReportSink {
    async fn save_report(&self, info: ReportInfo) -> Result<ReportInfo> {
        let report = &info.report;
        let epoch_start_height = report.epoch_start_height;
        let owner_address = self.signer.address();

        let existing = match self
            .uploads
            .find_upload(&owner_address, &Self::lookup_tags(report))
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(
                    target: "pipeline",
                    epoch_start_height,
                    error = %e,
                    "existing upload lookup failed, uploading anyway"
                );
                error_metrics().inc_error("upload_lookup", e.code());
                None
            }
        };
        if let Some(id) = existing {
            tracing::info!(
                target: "pipeline",
                epoch_start_height,
                report_tx_id = %id,
                "report already uploaded, skipping upload"
            );
            return Ok(ReportInfo {
                report_tx_id: Some(id),
                ..info
            });
        }

        let data = gzip_report(report)?;
        let signature = self.signer.sign(&data).await?;
        let item = UploadItem {
            data,
            tags: self.upload_tags(report),
            owner: self.signer.public_key(),
            signature,
        };
        let id = self.uploads.upload(item).await?;
        tracing::info!(
            target: "pipeline",
            epoch_start_height,
            report_tx_id = %id,
            "report uploaded"
        );
        Ok(ReportInfo {
            report_tx_id: Some(id),
            ..info
        })
    }
}
