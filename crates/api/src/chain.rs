// Path: crates/api/src/chain.rs

use async_trait::async_trait;
use observer_types::gateway::BlockInfo;
use observer_types::Result;

/// Reports the current chain height.
#[async_trait]
pub trait HeightSource: Send + Sync {
    /// Returns the current chain height.
    async fn get_height(&self) -> Result<u64>;
}

/// Looks up chain blocks by height.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns the block at `height`.
    async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo>;
}
