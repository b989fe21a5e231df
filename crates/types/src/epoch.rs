// Path: crates/types/src/epoch.rs
//! Epoch boundaries.

use serde::{Deserialize, Serialize};

/// A fixed-length window of chain height/time during which one observer set
/// and one name sample apply.
///
/// Timestamps are milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    /// The epoch index as reported by the ledger (or derived from heights).
    pub index: u64,
    /// The first block height of the epoch.
    pub start_height: u64,
    /// The timestamp at which the epoch starts.
    pub start_timestamp: u64,
    /// The timestamp at which the epoch ends.
    pub end_timestamp: u64,
}
