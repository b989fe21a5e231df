// Path: crates/api/src/probe.rs

use async_trait::async_trait;
use observer_types::resolution::ResolutionFingerprint;
use observer_types::{Entropy, Result};

/// Whose resolution a probe records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTarget {
    /// The trusted reference gateway.
    Reference,
    /// A gateway under assessment.
    Gateway,
}

/// Probes name resolution and identity on a single host.
#[async_trait]
pub trait ResolutionProber: Send + Sync {
    /// Resolves `name` on `host` and fingerprints the result.
    ///
    /// `entropy` seeds byte-range selection for large content and must be the
    /// same for the reference and the gateway. `reference_content_length`,
    /// when known, replaces the host's own length header.
    async fn probe(
        &self,
        host: &str,
        name: &str,
        entropy: &Entropy,
        reference_content_length: Option<u64>,
        target: ProbeTarget,
    ) -> Result<ResolutionFingerprint>;

    /// Returns the wallet the gateway at `fqdn` reports operating it.
    async fn observed_wallet(&self, fqdn: &str) -> Result<Option<String>>;
}
