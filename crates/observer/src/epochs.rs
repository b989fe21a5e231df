// Path: crates/observer/src/epochs.rs
//! Epoch boundaries derived from heights, or cached from the ledger.

use async_trait::async_trait;
use observer_api::chain::{BlockSource, HeightSource};
use observer_api::epoch::{EpochSource, LedgerEpochReader};
use observer_types::epoch::Epoch;
use observer_types::error::ObserverError;
use observer_types::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Average block time used to estimate epoch timestamps from heights.
pub const AVERAGE_BLOCK_TIME_MS: u64 = 120_000;

/// Fixed-length epochs anchored at a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochParams {
    /// The first height of epoch 0.
    pub anchor_height: u64,
    /// Blocks per epoch. Must be positive.
    pub block_length: u64,
}

impl EpochParams {
    /// Validates and builds the parameters.
    pub fn new(anchor_height: u64, block_length: u64) -> Result<Self> {
        if block_length == 0 {
            return Err(ObserverError::InvalidInput(
                "epoch block length must be positive".into(),
            ));
        }
        Ok(Self {
            anchor_height,
            block_length,
        })
    }

    // Heights below the anchor belong to epoch 0.
    fn offset(&self, height: u64) -> u64 {
        height.saturating_sub(self.anchor_height)
    }

    /// The first height of the epoch containing `height`.
    pub fn epoch_start(&self, height: u64) -> u64 {
        let offset = self.offset(height);
        self.anchor_height + offset - offset % self.block_length
    }

    /// The last height of the epoch containing `height`.
    pub fn epoch_end(&self, height: u64) -> u64 {
        self.epoch_start(height) + self.block_length - 1
    }

    /// The index of the epoch containing `height`.
    pub fn epoch_index(&self, height: u64) -> u64 {
        self.offset(height) / self.block_length
    }
}

/// Derives epochs from the current height alone.
///
/// Timestamps come from the start block, with the end estimated from the
/// average block time.
pub struct StaticEpochSource {
    params: EpochParams,
    heights: Arc<dyn HeightSource>,
    blocks: Arc<dyn BlockSource>,
}

impl StaticEpochSource {
    /// Builds the source.
    pub fn new(
        params: EpochParams,
        heights: Arc<dyn HeightSource>,
        blocks: Arc<dyn BlockSource>,
    ) -> Self {
        Self {
            params,
            heights,
            blocks,
        }
    }
}

#[async_trait]
impl EpochSource for StaticEpochSource {
    async fn current_epoch(&self) -> Result<Epoch> {
        let height = self.heights.get_height().await?;
        let start_height = self.params.epoch_start(height);
        let start_block = self.blocks.get_block_by_height(start_height).await?;
        let start_timestamp = start_block.timestamp * 1000;
        Ok(Epoch {
            index: self.params.epoch_index(height),
            start_height,
            start_timestamp,
            end_timestamp: start_timestamp + self.params.block_length * AVERAGE_BLOCK_TIME_MS,
        })
    }
}

/// Caches the ledger's current epoch until the chain's latest block
/// timestamp reaches the cached epoch's end.
///
/// The lock is held across the refresh, so concurrent callers see one ledger
/// query per epoch.
pub struct LedgerEpochSource {
    ledger: Arc<dyn LedgerEpochReader>,
    heights: Arc<dyn HeightSource>,
    blocks: Arc<dyn BlockSource>,
    cached: Mutex<Option<Epoch>>,
}

impl LedgerEpochSource {
    /// Builds the source with an empty cache.
    pub fn new(
        ledger: Arc<dyn LedgerEpochReader>,
        heights: Arc<dyn HeightSource>,
        blocks: Arc<dyn BlockSource>,
    ) -> Self {
        Self {
            ledger,
            heights,
            blocks,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EpochSource for LedgerEpochSource {
    async fn current_epoch(&self) -> Result<Epoch> {
        let mut cached = self.cached.lock().await;
        let height = self.heights.get_height().await?;
        let network_timestamp = self.blocks.get_block_by_height(height).await?.timestamp * 1000;

        if let Some(epoch) = cached.as_ref() {
            if epoch.end_timestamp > network_timestamp {
                return Ok(*epoch);
            }
        }

        let epoch = self.ledger.ledger_epoch().await?;
        tracing::info!(
            target: "epoch",
            epoch_index = epoch.index,
            start_height = epoch.start_height,
            start_timestamp = epoch.start_timestamp,
            end_timestamp = epoch.end_timestamp,
            "fetched epoch params"
        );
        *cached = Some(epoch);
        Ok(epoch)
    }
}
