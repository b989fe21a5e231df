// Path: crates/client/src/chain.rs
//! The chain's HTTP API: current height and blocks by height.

use crate::{get_json, upstream};
use async_trait::async_trait;
use observer_api::chain::{BlockSource, HeightSource};
use observer_types::gateway::BlockInfo;
use observer_types::Result;
use reqwest::Client;

/// Reads heights and blocks from `{base}/height` and
/// `{base}/block/height/{h}`.
#[derive(Clone)]
pub struct ChainClient {
    base: String,
    client: Client,
}

impl ChainClient {
    /// A client for the chain API at `base`.
    pub fn new(base: impl Into<String>, client: Client) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl HeightSource for ChainClient {
    async fn get_height(&self) -> Result<u64> {
        let url = format!("{}/height", self.base);
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| upstream(&url, e))?
            .text()
            .await
            .map_err(|e| upstream(&url, e))?;
        body.trim()
            .parse::<u64>()
            .map_err(|_| upstream(&url, format!("invalid height {:?}", body.trim())))
    }
}

#[async_trait]
impl BlockSource for ChainClient {
    async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo> {
        let url = format!("{}/block/height/{height}", self.base);
        let block: BlockInfo = get_json(&self.client, &url).await?;
        tracing::trace!(target: "chain", height, timestamp = block.timestamp, "fetched block");
        Ok(block)
    }
}
