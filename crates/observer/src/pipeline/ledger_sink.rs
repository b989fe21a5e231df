// Path: crates/observer/src/pipeline/ledger_sink.rs
//! Submits the failed-gateway summary to the ledger.

use super::{APP_NAME, APP_NAME_TAG, EPOCH_START_HEIGHT_TAG};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use observer_api::publish::{EpochObservations, LedgerClient, ObservationInteraction, ReportSink, Tag};
use observer_types::prelude::*;
use observer_types::report::ReportInfo;
use std::sync::Arc;

/// Largest failed-gateway chunk per interaction, in UTF-8 bytes.
pub const MAX_FAILED_GATEWAY_SUMMARY_BYTES: usize = 1280;

/// Splits `entries` into ordered chunks of at most `max_bytes` UTF-8 bytes.
///
/// An entry is never split; an entry larger than `max_bytes` gets a chunk of
/// its own. No chunk is empty.
pub fn split_by_size(entries: &[String], max_bytes: usize) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut size = 0;
    for entry in entries {
        if !current.is_empty() && size + entry.len() > max_bytes {
            chunks.push(std::mem::take(&mut current));
            size = 0;
        }
        size += entry.len();
        current.push(entry.clone());
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Records the report's failed gateways on the ledger, one interaction per
/// size-bounded chunk.
pub struct LedgerReportSink {
    ledger: Arc<dyn LedgerClient>,
    observer_address: String,
    retry: RetryPolicy,
}

impl LedgerReportSink {
    /// Builds the sink; every submission runs under `retry`.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        observer_address: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            observer_address: observer_address.into(),
            retry,
        }
    }

    /// Chunks still missing from the ledger.
    ///
    /// A chunk is already recorded when every wallet in it lists this
    /// observer. An empty summary yields one empty chunk unless the ledger
    /// already holds a report from this observer.
    fn pending_chunks(&self, summary: &[String], existing: &EpochObservations) -> Vec<Vec<String>> {
        if summary.is_empty() {
            if existing.reports.contains_key(&self.observer_address) {
                return Vec::new();
            }
            return vec![Vec::new()];
        }
        split_by_size(summary, MAX_FAILED_GATEWAY_SUMMARY_BYTES)
            .into_iter()
            .filter(|chunk| {
                !chunk.iter().all(|wallet| {
                    existing
                        .failure_summaries
                        .get(wallet)
                        .is_some_and(|observers| observers.contains(&self.observer_address))
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReportSink for LedgerReportSink {
    async fn save_report(&self, info: ReportInfo) -> Result<ReportInfo> {
        let report = &info.report;
        let epoch_start_height = report.epoch_start_height;
        let summary = report.failed_gateway_summary();
        let existing = self.ledger.epoch_observations(epoch_start_height).await?;
        let pending = self.pending_chunks(&summary, &existing);
        if pending.is_empty() {
            tracing::info!(
                target: "pipeline",
                epoch_start_height,
                "observations already saved"
            );
            return Ok(info);
        }

        let report_tx_id = info.report_tx_id.clone().ok_or_else(|| {
            ObserverError::InvalidInput("report has no upload id to reference".into())
        })?;
        let tags = vec![
            Tag::new(APP_NAME_TAG, APP_NAME),
            Tag::new("AR-IO-Component", "observer"),
            Tag::new(EPOCH_START_HEIGHT_TAG, epoch_start_height.to_string()),
            Tag::new("AR-IO-Observation-Report-Tx-Id", report_tx_id.as_str()),
        ];

        tracing::info!(
            target: "pipeline",
            epoch_start_height,
            failed_gateways = summary.len(),
            interactions = pending.len(),
            "saving observations"
        );
        let mut interaction_ids = Vec::with_capacity(pending.len());
        for failed_gateways in pending {
            let interaction = ObservationInteraction {
                observer_report_tx_id: report_tx_id.clone(),
                failed_gateways,
                tags: tags.clone(),
            };
            let id = self
                .retry
                .run("save_observations", || self.ledger.save_observations(&interaction))
                .await?;
            interaction_ids.push(id);
        }
        tracing::info!(
            target: "pipeline",
            epoch_start_height,
            interaction_ids = ?interaction_ids,
            "observations saved"
        );

        Ok(ReportInfo {
            interaction_tx_ids: Some(interaction_ids),
            ..info
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::empty_report;
    use observer_types::assessment::{GatewayAssessment, NameAssessments, OwnershipAssessment};
    use observer_types::report::ObserverReport;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Ledger {
        existing: EpochObservations,
        failures_before_success: AtomicU32,
        submitted: Mutex<Vec<ObservationInteraction>>,
    }

    #[async_trait]
    impl LedgerClient for Ledger {
        async fn epoch_observations(&self, _epoch_start_height: u64) -> Result<EpochObservations> {
            Ok(self.existing.clone())
        }

        async fn save_observations(&self, interaction: &ObservationInteraction) -> Result<String> {
            if self.failures_before_success.load(Ordering::SeqCst) > 0 {
                self.failures_before_success.fetch_sub(1, Ordering::SeqCst);
                return Err(ObserverError::UpstreamUnavailable("ledger busy".into()));
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(interaction.clone());
            Ok(format!("interaction-{}", submitted.len()))
        }
    }

    fn report_with_failures(wallets: &[&str]) -> ObserverReport {
        let mut report = empty_report(1000);
        for (i, wallet) in wallets.iter().enumerate() {
            let ownership = OwnershipAssessment {
                expected_wallets: BTreeSet::from([wallet.to_string()]),
                observed_wallet: None,
                pass: false,
                failure_reason: Some("unreachable".into()),
            };
            let names = NameAssessments {
                prescribed_names: BTreeMap::new(),
                chosen_names: BTreeMap::new(),
            };
            report
                .gateway_assessments
                .insert(format!("gw{i}.test"), GatewayAssessment::new(ownership, names));
        }
        report
    }

    fn sink(ledger: Arc<Ledger>) -> LedgerReportSink {
        LedgerReportSink::new(
            ledger,
            "observer-1",
            RetryPolicy::fixed(3, Duration::from_millis(10)),
        )
    }

    fn with_tx(report: ObserverReport) -> ReportInfo {
        ReportInfo {
            report_tx_id: Some("report-tx".into()),
            ..ReportInfo::new(report)
        }
    }

    #[test]
    fn test_split_never_breaks_entries() {
        let entries: Vec<String> = ["aaaa", "bbbb", "cccc", "dddddddddd"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let chunks = split_by_size(&entries, 8);
        assert_eq!(
            chunks,
            vec![
                vec!["aaaa".to_string(), "bbbb".to_string()],
                vec!["cccc".to_string()],
                vec!["dddddddddd".to_string()],
            ]
        );
        assert!(split_by_size(&[], 8).is_empty());
    }

    #[test]
    fn test_split_counts_utf8_bytes() {
        let entries = vec!["éé".to_string(), "éé".to_string()];
        assert_eq!(split_by_size(&entries, 6).len(), 2);
    }

    #[tokio::test]
    async fn test_submits_tagged_interaction_per_chunk() {
        let ledger = Arc::new(Ledger::default());
        let wallets: Vec<String> = (0..60).map(|i| format!("{i:0>43}")).collect();
        let refs: Vec<&str> = wallets.iter().map(String::as_str).collect();

        let info = sink(ledger.clone())
            .save_report(with_tx(report_with_failures(&refs)))
            .await
            .unwrap();

        let submitted = ledger.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 3);
        assert_eq!(
            submitted.iter().map(|i| i.failed_gateways.len()).sum::<usize>(),
            60
        );
        assert!(submitted[0]
            .tags
            .contains(&Tag::new("AR-IO-Observation-Report-Tx-Id", "report-tx")));
        assert!(submitted[0].tags.contains(&Tag::new(EPOCH_START_HEIGHT_TAG, "1000")));
        assert_eq!(info.interaction_tx_ids.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_no_submission_when_everything_is_recorded() {
        let mut existing = EpochObservations::default();
        for wallet in ["wallet-a", "wallet-b"] {
            existing
                .failure_summaries
                .insert(wallet.into(), vec!["other".into(), "observer-1".into()]);
        }
        let ledger = Arc::new(Ledger {
            existing,
            ..Default::default()
        });

        let info = sink(ledger.clone())
            .save_report(with_tx(report_with_failures(&["wallet-a", "wallet-b"])))
            .await
            .unwrap();

        assert!(ledger.submitted.lock().unwrap().is_empty());
        assert!(info.interaction_tx_ids.is_none());
    }

    #[tokio::test]
    async fn test_empty_summary_submits_once() {
        let ledger = Arc::new(Ledger::default());
        sink(ledger.clone())
            .save_report(with_tx(empty_report(1000)))
            .await
            .unwrap();
        let submitted = ledger.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].failed_gateways.is_empty());
        drop(submitted);

        let mut existing = EpochObservations::default();
        existing.reports.insert("observer-1".into(), "report-tx".into());
        let ledger = Arc::new(Ledger {
            existing,
            ..Default::default()
        });
        sink(ledger.clone())
            .save_report(with_tx(empty_report(1000)))
            .await
            .unwrap();
        assert!(ledger.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_gives_up() {
        let ledger = Arc::new(Ledger {
            failures_before_success: AtomicU32::new(2),
            ..Default::default()
        });
        let info = sink(ledger.clone())
            .save_report(with_tx(report_with_failures(&["wallet-a"])))
            .await
            .unwrap();
        assert_eq!(info.interaction_tx_ids.unwrap(), vec!["interaction-1"]);

        let ledger = Arc::new(Ledger {
            failures_before_success: AtomicU32::new(5),
            ..Default::default()
        });
        let err = sink(ledger)
            .save_report(with_tx(report_with_failures(&["wallet-a"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::MaxRetriesExceeded { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_missing_report_id_is_an_error() {
        let ledger = Arc::new(Ledger::default());
        let err = sink(ledger)
            .save_report(ReportInfo::new(report_with_failures(&["wallet-a"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::InvalidInput(_)));
    }
}
