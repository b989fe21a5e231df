// Path: crates/observer/src/pipeline/fs_store.rs
//! Reports persisted as `{epoch_start_height}.json` under one directory.

use async_trait::async_trait;
use observer_api::publish::{ReportSink, ReportStore};
use observer_types::report::{ObserverReport, ReportInfo};
use observer_types::Result;
use std::path::{Path, PathBuf};

/// Durable, write-once report store.
///
/// The first report saved for an epoch wins; later saves for the same epoch
/// get the persisted copy back. Assumes a single writing process.
#[derive(Debug, Clone)]
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    /// A store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn report_path(&self, epoch_start_height: u64) -> PathBuf {
        self.dir.join(format!("{epoch_start_height}.json"))
    }

    async fn read(path: &Path) -> Result<ObserverReport> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ReportSink for FsReportStore {
    async fn save_report(&self, info: ReportInfo) -> Result<ReportInfo> {
        let epoch_start_height = info.report.epoch_start_height;
        let path = self.report_path(epoch_start_height);
        if tokio::fs::try_exists(&path).await? {
            tracing::info!(
                target: "pipeline",
                epoch_start_height,
                path = %path.display(),
                "report already persisted, keeping stored copy"
            );
            let report = Self::read(&path).await?;
            return Ok(ReportInfo { report, ..info });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(&info.report)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::info!(
            target: "pipeline",
            epoch_start_height,
            path = %path.display(),
            "report persisted"
        );
        Ok(info)
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn get_report(&self, epoch_start_height: u64) -> Result<Option<ObserverReport>> {
        let path = self.report_path(epoch_start_height);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Self::read(&path).await.map(Some)
    }

    async fn latest_report(&self) -> Result<Option<ObserverReport>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(None);
        }
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut latest: Option<u64> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let height = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(height) = height {
                latest = latest.max(Some(height));
            }
        }
        match latest {
            Some(height) => self.get_report(height).await,
            None => Ok(None),
        }
    }
}
