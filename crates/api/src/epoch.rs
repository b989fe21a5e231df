// Path: crates/api/src/epoch.rs

use async_trait::async_trait;
use observer_types::epoch::Epoch;
use observer_types::Result;

/// Resolves the epoch the chain is currently in.
#[async_trait]
pub trait EpochSource: Send + Sync {
    /// Returns the current epoch.
    async fn current_epoch(&self) -> Result<Epoch>;
}

/// Reads the ledger's view of the current epoch.
#[async_trait]
pub trait LedgerEpochReader: Send + Sync {
    /// Returns the epoch parameters the ledger reports as current.
    async fn ledger_epoch(&self) -> Result<Epoch>;
}
