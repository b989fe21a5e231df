// Path: crates/observer/src/assessor.rs
//! Assesses one gateway: ownership plus every sampled name.

use crate::{now_secs, truncate_utf8};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use observer_api::probe::{ProbeTarget, ResolutionProber};
use observer_telemetry::observer_metrics;
use observer_types::assessment::{
    GatewayAssessment, NameAssessment, NameAssessments, OwnershipAssessment,
};
use observer_types::error::ObserverError;
use observer_types::resolution::ResolutionFingerprint;
use observer_types::{Entropy, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Upper bound on a recorded failure reason, in bytes.
pub const MAX_FAILURE_REASON_BYTES: usize = 512;

type ReferenceSlot = Arc<OnceCell<std::result::Result<ResolutionFingerprint, String>>>;

/// Assesses gateways for one report cycle.
///
/// One instance lives for exactly one cycle: it pins the cycle entropy and
/// memoizes the reference gateway's fingerprint per name, so every gateway in
/// the cycle is compared against the same reference.
pub struct GatewayAssessor {
    prober: Arc<dyn ResolutionProber>,
    reference_host: String,
    entropy: Entropy,
    name_concurrency: usize,
    reference: DashMap<String, ReferenceSlot>,
}

impl GatewayAssessor {
    /// Builds an assessor for a cycle seeded with `entropy`.
    pub fn new(
        prober: Arc<dyn ResolutionProber>,
        reference_host: impl Into<String>,
        entropy: Entropy,
        name_concurrency: usize,
    ) -> Self {
        Self {
            prober,
            reference_host: reference_host.into(),
            entropy,
            name_concurrency: name_concurrency.max(1),
            reference: DashMap::new(),
        }
    }

    /// Assesses the gateway at `fqdn`, claimed by `expected_wallets`.
    ///
    /// Never fails: every probe error becomes a failing assessment.
    pub async fn assess(
        &self,
        fqdn: &str,
        expected_wallets: &BTreeSet<String>,
        prescribed_names: &[String],
        chosen_names: &[String],
    ) -> GatewayAssessment {
        let (ownership, names) = tokio::join!(
            self.assess_ownership(fqdn, expected_wallets),
            self.assess_names(fqdn, prescribed_names, chosen_names)
        );
        let assessment = GatewayAssessment::new(ownership, names);
        observer_metrics().inc_gateway_assessments(if assessment.pass { "pass" } else { "fail" });
        tracing::debug!(target: "assessor", fqdn, pass = assessment.pass, "assessed gateway");
        assessment
    }

    async fn assess_ownership(
        &self,
        fqdn: &str,
        expected_wallets: &BTreeSet<String>,
    ) -> OwnershipAssessment {
        let (observed_wallet, failure_reason) = match self.prober.observed_wallet(fqdn).await {
            Ok(Some(wallet)) if expected_wallets.contains(&wallet) => (Some(wallet), None),
            Ok(Some(wallet)) => {
                let expected = expected_wallets.iter().cloned().collect::<Vec<_>>().join(", ");
                let reason = format!("Wallet mismatch: expected one of [{expected}] but found {wallet}");
                (Some(wallet), Some(reason))
            }
            Ok(None) => (None, Some("Gateway did not report a wallet".to_string())),
            Err(e) => (None, Some(truncate_utf8(&e.to_string(), MAX_FAILURE_REASON_BYTES))),
        };
        OwnershipAssessment {
            expected_wallets: expected_wallets.clone(),
            observed_wallet,
            pass: failure_reason.is_none(),
            failure_reason,
        }
    }

    async fn assess_names(
        &self,
        fqdn: &str,
        prescribed_names: &[String],
        chosen_names: &[String],
    ) -> NameAssessments {
        let distinct: BTreeSet<&String> = prescribed_names.iter().chain(chosen_names).collect();
        let results: BTreeMap<String, NameAssessment> = stream::iter(distinct)
            .map(|name| async move { (name.clone(), self.assess_name(fqdn, name).await) })
            .buffer_unordered(self.name_concurrency)
            .collect()
            .await;

        let pick = |names: &[String]| {
            names
                .iter()
                .filter_map(|name| results.get(name).map(|a| (name.clone(), a.clone())))
                .collect::<BTreeMap<_, _>>()
        };
        NameAssessments {
            prescribed_names: pick(prescribed_names),
            chosen_names: pick(chosen_names),
        }
    }

    async fn assess_name(&self, fqdn: &str, name: &str) -> NameAssessment {
        let assessment = match self.compare_name(fqdn, name).await {
            Ok(assessment) => assessment,
            Err(e) => {
                tracing::debug!(target: "assessor", fqdn, name, error = %e, "name assessment failed");
                NameAssessment::failed(
                    now_secs(),
                    truncate_utf8(&e.to_string(), MAX_FAILURE_REASON_BYTES),
                )
            }
        };
        observer_metrics().inc_name_assessments(if assessment.pass { "pass" } else { "fail" });
        assessment
    }

    async fn compare_name(&self, fqdn: &str, name: &str) -> Result<NameAssessment> {
        let reference = self.reference_fingerprint(name).await?;
        let gateway = self
            .prober
            .probe(
                fqdn,
                name,
                &self.entropy,
                reference.content_length,
                ProbeTarget::Gateway,
            )
            .await?;
        Ok(NameAssessment::compare(&reference, &gateway, now_secs()))
    }

    /// The reference gateway's fingerprint for `name`, probed at most once
    /// per cycle. A failed reference probe is memoized too.
    async fn reference_fingerprint(&self, name: &str) -> Result<ResolutionFingerprint> {
        let slot = self
            .reference
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        slot.get_or_init(|| async {
            self.prober
                .probe(
                    &self.reference_host,
                    name,
                    &self.entropy,
                    None,
                    ProbeTarget::Reference,
                )
                .await
                .map_err(|e| e.to_string())
        })
        .await
        .clone()
        .map_err(|e| ObserverError::ProbeFailed(format!("reference gateway: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use observer_types::resolution::ProbeTimings;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const REFERENCE: &str = "reference.test";

    #[derive(Default)]
    struct MockProber {
        // (host, name) -> resolved id; missing pairs fail.
        resolutions: HashMap<(String, String), String>,
        wallets: HashMap<String, String>,
        calls: Mutex<Vec<(String, String, Option<u64>, ProbeTarget)>>,
        error_message: String,
    }

    impl MockProber {
        fn resolve(mut self, host: &str, name: &str, id: &str) -> Self {
            self.resolutions
                .insert((host.to_string(), name.to_string()), id.to_string());
            self
        }

        fn wallet(mut self, fqdn: &str, wallet: &str) -> Self {
            self.wallets.insert(fqdn.to_string(), wallet.to_string());
            self
        }

        fn reference_calls(&self, name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(host, n, _, _)| host == REFERENCE && n == name)
                .count()
        }
    }

    #[async_trait]
    impl ResolutionProber for MockProber {
        async fn probe(
            &self,
            host: &str,
            name: &str,
            _entropy: &Entropy,
            reference_content_length: Option<u64>,
            target: ProbeTarget,
        ) -> Result<ResolutionFingerprint> {
            self.calls.lock().unwrap().push((
                host.to_string(),
                name.to_string(),
                reference_content_length,
                target,
            ));
            match self.resolutions.get(&(host.to_string(), name.to_string())) {
                Some(id) => Ok(ResolutionFingerprint {
                    status_code: Some(200),
                    resolved_id: Some(id.clone()),
                    ttl_seconds: Some("3600".into()),
                    content_type: Some("text/html".into()),
                    content_length: Some(42),
                    data_hash_digest: Some(format!("hash-of-{id}")),
                    timings: Some(ProbeTimings::default()),
                }),
                None => Err(ObserverError::ProbeFailed(format!(
                    "{host}/{name} unreachable {}",
                    self.error_message
                ))),
            }
        }

        async fn observed_wallet(&self, fqdn: &str) -> Result<Option<String>> {
            Ok(self.wallets.get(fqdn).cloned())
        }
    }

    fn wallets(ws: &[&str]) -> BTreeSet<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|n| n.to_string()).collect()
    }

    fn assessor(prober: Arc<MockProber>) -> GatewayAssessor {
        GatewayAssessor::new(prober, REFERENCE, Entropy(vec![9]), 2)
    }

    #[tokio::test]
    async fn test_matching_gateway_passes() {
        let prober = Arc::new(
            MockProber::default()
                .resolve(REFERENCE, "a", "id-a")
                .resolve("gw.test", "a", "id-a")
                .wallet("gw.test", "w1"),
        );
        let result = assessor(prober.clone())
            .assess("gw.test", &wallets(&["w1"]), &names(&["a"]), &[])
            .await;
        assert!(result.pass);
        assert!(result.name_assessments.prescribed_names["a"].pass);
        // The gateway was probed with the reference's content length.
        let calls = prober.calls.lock().unwrap();
        assert!(calls
            .iter()
            .any(|(host, _, len, target)| host == "gw.test" && *len == Some(42) && *target == ProbeTarget::Gateway));
    }

    #[tokio::test]
    async fn test_resolved_id_mismatch_is_reported() {
        let prober = Arc::new(
            MockProber::default()
                .resolve(REFERENCE, "a", "id-a")
                .resolve("gw.test", "a", "id-other")
                .wallet("gw.test", "w1"),
        );
        let result = assessor(prober)
            .assess("gw.test", &wallets(&["w1"]), &[], &names(&["a"]))
            .await;
        let name = &result.name_assessments.chosen_names["a"];
        assert!(!name.pass);
        assert!(name.failure_reason.as_deref().unwrap().contains("resolvedId mismatch"));
        assert!(!result.pass);
    }

    #[tokio::test]
    async fn test_ownership_failure_fails_gateway_even_when_names_pass() {
        let prober = Arc::new(
            MockProber::default()
                .resolve(REFERENCE, "a", "id-a")
                .resolve("gw.test", "a", "id-a")
                .wallet("gw.test", "intruder"),
        );
        let result = assessor(prober)
            .assess("gw.test", &wallets(&["w1"]), &names(&["a"]), &[])
            .await;
        assert!(result.name_assessments.pass());
        assert!(!result.ownership_assessment.pass);
        assert_eq!(result.ownership_assessment.observed_wallet.as_deref(), Some("intruder"));
        assert!(!result.pass);
    }

    #[tokio::test]
    async fn test_any_claiming_wallet_satisfies_ownership() {
        let prober = Arc::new(MockProber::default().wallet("gw.test", "w2"));
        let result = assessor(prober)
            .assess("gw.test", &wallets(&["w1", "w2"]), &[], &[])
            .await;
        assert!(result.ownership_assessment.pass);
        assert!(result.pass);
    }

    #[tokio::test]
    async fn test_probe_error_is_isolated_and_truncated() {
        let mut mock = MockProber::default()
            .resolve(REFERENCE, "good", "id-g")
            .resolve("gw.test", "good", "id-g")
            .resolve(REFERENCE, "bad", "id-b")
            .wallet("gw.test", "w1");
        mock.error_message = "é".repeat(600);
        let prober = Arc::new(mock);
        let result = assessor(prober)
            .assess("gw.test", &wallets(&["w1"]), &names(&["good", "bad"]), &[])
            .await;
        let prescribed = &result.name_assessments.prescribed_names;
        assert!(prescribed["good"].pass);
        let bad = &prescribed["bad"];
        assert!(!bad.pass);
        assert!(bad.failure_reason.as_ref().unwrap().len() <= MAX_FAILURE_REASON_BYTES);
    }

    #[tokio::test]
    async fn test_reference_probed_once_per_name_across_gateways() {
        let prober = Arc::new(
            MockProber::default()
                .resolve(REFERENCE, "a", "id-a")
                .resolve(REFERENCE, "b", "id-b")
                .resolve("gw1.test", "a", "id-a")
                .resolve("gw2.test", "a", "id-a")
                .wallet("gw1.test", "w1")
                .wallet("gw2.test", "w2"),
        );
        let assessor = assessor(prober.clone());
        let (w1, w2) = (wallets(&["w1"]), wallets(&["w2"]));
        let prescribed = names(&["a", "b"]);
        let chosen = names(&["a"]);
        let (one, two) = tokio::join!(
            assessor.assess("gw1.test", &w1, &prescribed, &chosen),
            assessor.assess("gw2.test", &w2, &prescribed, &chosen)
        );
        assert_eq!(prober.reference_calls("a"), 1);
        assert_eq!(prober.reference_calls("b"), 1);
        // "a" appears in both lists but is probed once per gateway.
        let gw1_a = prober
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(host, name, _, _)| host == "gw1.test" && name == "a")
            .count();
        assert_eq!(gw1_a, 1);
        assert!(one.name_assessments.chosen_names["a"].pass);
        assert!(!two.name_assessments.prescribed_names["b"].pass);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(300);
        let truncated = truncate_utf8(&text, 511);
        assert_eq!(truncated.len(), 510);
        assert_eq!(truncate_utf8("short", 512), "short");
    }
}
