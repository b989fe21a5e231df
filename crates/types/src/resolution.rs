// Path: crates/types/src/resolution.rs
//! Resolution fingerprints produced by probing one name on one host.

use serde::{Deserialize, Serialize};

/// Wall-clock durations of the requests made for one probe, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeTimings {
    /// Duration of the initial `HEAD` request.
    pub head_ms: u64,
    /// Duration of the body (or range) fetches.
    pub fetch_ms: u64,
    /// Total duration of the probe.
    pub total_ms: u64,
}

/// A comparable summary of how a host resolved a name.
///
/// Every content field is `None` when the host answered `404`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionFingerprint {
    /// HTTP status of the `HEAD` request.
    pub status_code: Option<u16>,
    /// The `X-ArNS-Resolved-Id` header.
    pub resolved_id: Option<String>,
    /// The `X-ArNS-TTL-Seconds` header.
    pub ttl_seconds: Option<String>,
    /// The `Content-Type` header of the body fetch.
    pub content_type: Option<String>,
    /// The content length the sampling decision was based on.
    pub content_length: Option<u64>,
    /// base64url (unpadded) SHA-256 over the sampled content bytes.
    pub data_hash_digest: Option<String>,
    /// Request durations, absent for fingerprints not produced by a probe.
    pub timings: Option<ProbeTimings>,
}

impl ResolutionFingerprint {
    /// The fingerprint of a host that does not know the name.
    pub fn not_found(timings: ProbeTimings) -> Self {
        Self {
            status_code: Some(404),
            timings: Some(timings),
            ..Default::default()
        }
    }

    /// Lists every compared field that differs from `reference`.
    ///
    /// Content length is not compared; the prober already samples the gateway
    /// using the reference's length.
    pub fn mismatches(&self, reference: &ResolutionFingerprint) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.resolved_id != reference.resolved_id {
            fields.push("resolvedId");
        }
        if self.ttl_seconds != reference.ttl_seconds {
            fields.push("ttlSeconds");
        }
        if self.content_type != reference.content_type {
            fields.push("contentType");
        }
        if self.data_hash_digest != reference.data_hash_digest {
            fields.push("dataHashDigest");
        }
        fields
    }
}
