// Path: crates/types/src/gateway.rs
//! Gateway and chain records supplied by external collaborators.

use serde::{Deserialize, Serialize};

/// The wallet placeholder used for statically configured hosts.
pub const UNKNOWN_WALLET: &str = "<unknown>";

/// One on-ledger gateway registration.
///
/// Several registrations may share an FQDN; the report builder groups them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayHost {
    /// The fully qualified domain name the gateway serves from.
    pub fqdn: String,
    /// The wallet address that registered the gateway.
    pub wallet: String,
    /// The first height at which the registration is active, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_height: Option<u64>,
    /// The last height at which the registration is active, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_height: Option<u64>,
}

impl GatewayHost {
    /// A host with no activity bounds.
    pub fn new(fqdn: impl Into<String>, wallet: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            wallet: wallet.into(),
            start_height: None,
            end_height: None,
        }
    }

    /// Whether the registration covers `height`.
    pub fn is_active_at(&self, height: u64) -> bool {
        self.start_height.map_or(true, |start| start <= height)
            && self.end_height.map_or(true, |end| height <= end)
    }
}

/// The subset of a chain block the observer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// The block's unique identifier, base64url encoded.
    #[serde(default)]
    pub indep_hash: Option<String>,
    /// The block timestamp in seconds.
    pub timestamp: u64,
}
