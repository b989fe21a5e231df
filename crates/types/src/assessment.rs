// Path: crates/types/src/assessment.rs
//! Per-name, per-ownership and per-gateway assessment records.

use crate::resolution::{ProbeTimings, ResolutionFingerprint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The fraction of assessed names that must pass for a gateway to pass.
pub const NAME_PASS_THRESHOLD: f64 = 0.8;

/// The outcome of comparing a gateway's resolution of one name against the
/// reference gateway's resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameAssessment {
    /// UNIX seconds at which the assessment was made.
    pub assessed_at: u64,
    /// Status code returned by the reference gateway.
    pub expected_status_code: Option<u16>,
    /// Status code returned by the assessed gateway.
    pub resolved_status_code: Option<u16>,
    /// Resolved id returned by the reference gateway.
    pub expected_id: Option<String>,
    /// Resolved id returned by the assessed gateway.
    pub resolved_id: Option<String>,
    /// Content digest computed from the reference gateway.
    pub expected_data_hash: Option<String>,
    /// Content digest computed from the assessed gateway.
    pub resolved_data_hash: Option<String>,
    /// Whether every compared field matched.
    pub pass: bool,
    /// A human-readable description of why the assessment failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// The assessed gateway's probe timings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<ProbeTimings>,
}

impl NameAssessment {
    /// Diffs `gateway` against `reference`.
    pub fn compare(
        reference: &ResolutionFingerprint,
        gateway: &ResolutionFingerprint,
        assessed_at: u64,
    ) -> Self {
        let mismatches = gateway.mismatches(reference);
        let failure_reason = if mismatches.is_empty() {
            None
        } else {
            Some(
                mismatches
                    .iter()
                    .map(|field| format!("{field} mismatch"))
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        Self {
            assessed_at,
            expected_status_code: reference.status_code,
            resolved_status_code: gateway.status_code,
            expected_id: reference.resolved_id.clone(),
            resolved_id: gateway.resolved_id.clone(),
            expected_data_hash: reference.data_hash_digest.clone(),
            resolved_data_hash: gateway.data_hash_digest.clone(),
            pass: failure_reason.is_none(),
            failure_reason,
            timings: gateway.timings,
        }
    }

    /// A failing assessment recording a probe error.
    pub fn failed(assessed_at: u64, reason: impl Into<String>) -> Self {
        Self {
            assessed_at,
            expected_status_code: None,
            resolved_status_code: None,
            expected_id: None,
            resolved_id: None,
            expected_data_hash: None,
            resolved_data_hash: None,
            pass: false,
            failure_reason: Some(reason.into()),
            timings: None,
        }
    }
}

/// The outcome of checking which wallet a gateway claims to be operated by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipAssessment {
    /// Every wallet registered for the gateway's FQDN.
    pub expected_wallets: BTreeSet<String>,
    /// The wallet the gateway reported, if it reported one.
    pub observed_wallet: Option<String>,
    /// Whether the observed wallet is one of the expected wallets.
    pub pass: bool,
    /// Why the ownership check failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Name assessments for one gateway, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameAssessments {
    /// Protocol-assigned names.
    pub prescribed_names: BTreeMap<String, NameAssessment>,
    /// Names the observer selected itself.
    pub chosen_names: BTreeMap<String, NameAssessment>,
}

impl NameAssessments {
    /// Whether at least [`NAME_PASS_THRESHOLD`] of the distinct names passed.
    ///
    /// A name present in both lists counts once and passes only if every
    /// assessment recorded for it passed. No names at all counts as passing.
    pub fn pass(&self) -> bool {
        let mut outcomes: BTreeMap<&str, bool> = BTreeMap::new();
        for (name, assessment) in self.prescribed_names.iter().chain(self.chosen_names.iter()) {
            let entry = outcomes.entry(name.as_str()).or_insert(true);
            *entry &= assessment.pass;
        }
        if outcomes.is_empty() {
            return true;
        }
        let passed = outcomes.values().filter(|pass| **pass).count();
        passed as f64 / outcomes.len() as f64 >= NAME_PASS_THRESHOLD
    }
}

/// The full assessment of one gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAssessment {
    /// The ownership check.
    pub ownership_assessment: OwnershipAssessment,
    /// The name resolution checks.
    pub name_assessments: NameAssessments,
    /// `ownership && names`.
    pub pass: bool,
}

impl GatewayAssessment {
    /// Combines the two halves, deriving the overall outcome.
    pub fn new(ownership_assessment: OwnershipAssessment, name_assessments: NameAssessments) -> Self {
        let pass = ownership_assessment.pass && name_assessments.pass();
        Self {
            ownership_assessment,
            name_assessments,
            pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(id: &str) -> ResolutionFingerprint {
        ResolutionFingerprint {
            status_code: Some(200),
            resolved_id: Some(id.into()),
            ttl_seconds: Some("3600".into()),
            content_type: Some("text/html".into()),
            content_length: Some(5),
            data_hash_digest: Some("digest".into()),
            timings: None,
        }
    }

    fn names_with(total: usize, passing: usize) -> NameAssessments {
        let mut names = NameAssessments::default();
        for i in 0..total {
            let assessment = if i < passing {
                NameAssessment::compare(&fingerprint("a"), &fingerprint("a"), 1)
            } else {
                NameAssessment::failed(1, "boom")
            };
            names.chosen_names.insert(format!("name-{i}"), assessment);
        }
        names
    }

    fn ownership(pass: bool) -> OwnershipAssessment {
        OwnershipAssessment {
            expected_wallets: BTreeSet::from(["w1".to_string()]),
            observed_wallet: Some(if pass { "w1" } else { "w2" }.to_string()),
            pass,
            failure_reason: None,
        }
    }

    #[test]
    fn test_resolved_id_difference_fails_with_reason() {
        let assessment = NameAssessment::compare(&fingerprint("a"), &fingerprint("b"), 42);
        assert!(!assessment.pass);
        let reason = assessment.failure_reason.unwrap();
        assert!(reason.contains("resolvedId mismatch"));
        assert!(!reason.contains("dataHashDigest"));
    }

    #[test]
    fn test_name_threshold_is_inclusive() {
        assert!(names_with(10, 8).pass());
        assert!(!names_with(10, 7).pass());
        assert!(names_with(0, 0).pass());
    }

    #[test]
    fn test_duplicate_name_counts_once() {
        let mut names = names_with(4, 4);
        names
            .prescribed_names
            .insert("name-0".into(), NameAssessment::failed(1, "boom"));
        // 3 of 4 distinct names pass.
        assert!(!names.pass());
    }

    #[test]
    fn test_ownership_failure_fails_gateway() {
        assert!(!GatewayAssessment::new(ownership(false), names_with(5, 5)).pass);
        assert!(GatewayAssessment::new(ownership(true), names_with(5, 5)).pass);
    }

    #[test]
    fn test_failure_reason_omitted_when_passing() {
        let assessment = NameAssessment::compare(&fingerprint("a"), &fingerprint("a"), 1);
        let json = serde_json::to_value(&assessment).unwrap();
        assert!(json.get("failureReason").is_none());
        assert_eq!(json["expectedId"], "a");
    }
}
