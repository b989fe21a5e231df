// Path: crates/types/src/report.rs
//! The observer report and the accumulator threaded through publish sinks.

use crate::assessment::GatewayAssessment;
use crate::epoch::Epoch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The report structure version. Bump on any incompatible change.
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// A signed-off observation of every assessed gateway for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverReport {
    /// See [`REPORT_FORMAT_VERSION`].
    pub format_version: u32,
    /// The address of the observer that produced the report.
    pub observer_address: String,
    /// The epoch index.
    pub epoch_index: u64,
    /// The first height of the epoch.
    pub epoch_start_height: u64,
    /// The epoch start time in milliseconds.
    pub epoch_start_timestamp: u64,
    /// The epoch end time in milliseconds.
    pub epoch_end_timestamp: u64,
    /// UNIX seconds at which the report was assembled.
    pub generated_at: u64,
    /// Assessments keyed by gateway FQDN.
    pub gateway_assessments: BTreeMap<String, GatewayAssessment>,
}

impl ObserverReport {
    /// The epoch the report covers.
    pub fn epoch(&self) -> Epoch {
        Epoch {
            index: self.epoch_index,
            start_height: self.epoch_start_height,
            start_timestamp: self.epoch_start_timestamp,
            end_timestamp: self.epoch_end_timestamp,
        }
    }

    /// Every expected wallet whose gateway reported a different wallet (or
    /// none), sorted and deduplicated.
    pub fn failed_gateway_summary(&self) -> Vec<String> {
        let mut failed = std::collections::BTreeSet::new();
        for assessment in self.gateway_assessments.values() {
            let ownership = &assessment.ownership_assessment;
            for wallet in &ownership.expected_wallets {
                if ownership.observed_wallet.as_deref() != Some(wallet.as_str()) {
                    failed.insert(wallet.clone());
                }
            }
        }
        failed.into_iter().collect()
    }
}

/// The value passed along the publish pipeline. Sinks enrich it as they go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInfo {
    /// The report being published.
    pub report: ObserverReport,
    /// The content-address id of the uploaded report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_tx_id: Option<String>,
    /// The ids of the ledger interactions that referenced the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_tx_ids: Option<Vec<String>>,
}

impl ReportInfo {
    /// Wraps a freshly built report.
    pub fn new(report: ObserverReport) -> Self {
        Self {
            report,
            report_tx_id: None,
            interaction_tx_ids: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{NameAssessments, OwnershipAssessment};
    use std::collections::BTreeSet;

    fn gateway(expected: &[&str], observed: Option<&str>) -> GatewayAssessment {
        let expected_wallets: BTreeSet<String> = expected.iter().map(|w| w.to_string()).collect();
        let pass = observed.map_or(false, |w| expected_wallets.contains(w));
        GatewayAssessment::new(
            OwnershipAssessment {
                expected_wallets,
                observed_wallet: observed.map(str::to_string),
                pass,
                failure_reason: None,
            },
            NameAssessments::default(),
        )
    }

    #[test]
    fn test_failed_summary_lists_unmatched_wallets_sorted() {
        let mut gateway_assessments = BTreeMap::new();
        gateway_assessments.insert("a.example".into(), gateway(&["w3", "w1"], Some("w1")));
        gateway_assessments.insert("b.example".into(), gateway(&["w2"], None));
        gateway_assessments.insert("c.example".into(), gateway(&["w4"], Some("w4")));
        let report = ObserverReport {
            format_version: REPORT_FORMAT_VERSION,
            observer_address: "me".into(),
            epoch_index: 1,
            epoch_start_height: 100,
            epoch_start_timestamp: 0,
            epoch_end_timestamp: 1,
            generated_at: 0,
            gateway_assessments,
        };
        assert_eq!(report.failed_gateway_summary(), vec!["w2", "w3"]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["formatVersion"], 1);
        assert!(json["gatewayAssessments"]["a.example"]["ownershipAssessment"].is_object());
    }
}
