// Path: crates/client/src/remote_cache.rs
//! Gateway and name lists read from a contract-state cache.

use crate::get_json;
use async_trait::async_trait;
use observer_api::chain::BlockSource;
use observer_api::lists::{GatewayListSource, NameListSource};
use observer_types::error::ObserverError;
use observer_types::gateway::GatewayHost;
use observer_types::Result;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Average block time in seconds.
pub const AVERAGE_BLOCK_TIME_SECS: u64 = 120;
/// A lease must have started this many blocks before the sampled block.
pub const LEASE_MIN_AGE_BLOCKS: u64 = 50;
/// A lease must run at least this many blocks past the sampled block.
pub const LEASE_MIN_REMAINING_BLOCKS: u64 = 6000;

#[derive(Debug, Deserialize)]
pub(crate) struct GatewaySettings {
    pub fqdn: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GatewayRecord {
    pub settings: Option<GatewaySettings>,
    #[serde(default, alias = "start")]
    pub start_height: Option<u64>,
    #[serde(default, alias = "end")]
    pub end_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GatewaysResponse {
    pub gateways: BTreeMap<String, GatewayRecord>,
}

impl GatewaysResponse {
    /// Flattens the wallet-keyed map. A zero end height means unbounded.
    pub(crate) fn into_hosts(self) -> Result<Vec<GatewayHost>> {
        self.gateways
            .into_iter()
            .map(|(wallet, record)| {
                let fqdn = record
                    .settings
                    .and_then(|s| s.fqdn)
                    .ok_or_else(|| {
                        ObserverError::UpstreamUnavailable(format!("gateway {wallet} has no fqdn"))
                    })?;
                Ok(GatewayHost {
                    fqdn,
                    wallet,
                    start_height: record.start_height,
                    end_height: record.end_height.filter(|end| *end > 0),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameRecord {
    #[serde(default)]
    start_timestamp: Option<u64>,
    #[serde(default)]
    end_timestamp: Option<u64>,
}

impl NameRecord {
    /// Whether the lease is settled and long-lived relative to
    /// `block_timestamp` (seconds).
    fn is_stable_at(&self, block_timestamp: u64) -> bool {
        let min_age = AVERAGE_BLOCK_TIME_SECS * LEASE_MIN_AGE_BLOCKS;
        let min_remaining = AVERAGE_BLOCK_TIME_SECS * LEASE_MIN_REMAINING_BLOCKS;
        let started = self
            .start_timestamp
            .map_or(true, |start| start.saturating_add(min_age) <= block_timestamp);
        let lasting = self
            .end_timestamp
            .map_or(true, |end| end >= block_timestamp.saturating_add(min_remaining));
        started && lasting
    }
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: BTreeMap<String, NameRecord>,
}

/// Reads `{base}/gateways` and `{base}/records`.
///
/// Names are filtered against the timestamp of the requested block and
/// sorted, so an index means the same name to every observer reading the
/// same height. The last height's list is cached.
pub struct RemoteCacheClient {
    base: String,
    client: Client,
    blocks: Arc<dyn BlockSource>,
    names: Mutex<Option<(u64, Vec<String>)>>,
}

impl RemoteCacheClient {
    /// A client for the cache at `base`.
    pub fn new(base: impl Into<String>, client: Client, blocks: Arc<dyn BlockSource>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
            blocks,
            names: Mutex::new(None),
        }
    }
}

#[async_trait]
impl GatewayListSource for RemoteCacheClient {
    async fn get_hosts(&self) -> Result<Vec<GatewayHost>> {
        let url = format!("{}/gateways", self.base);
        let resp: GatewaysResponse = get_json(&self.client, &url).await?;
        resp.into_hosts()
    }
}

#[async_trait]
impl NameListSource for RemoteCacheClient {
    async fn get_names_count(&self, height: u64) -> Result<usize> {
        Ok(self.get_all_names(height).await?.len())
    }

    async fn get_name(&self, height: u64, index: usize) -> Result<String> {
        let names = self.get_all_names(height).await?;
        names.get(index).cloned().ok_or_else(|| {
            ObserverError::InvalidInput(format!(
                "name index {index} out of range for {} names",
                names.len()
            ))
        })
    }

    async fn get_all_names(&self, height: u64) -> Result<Vec<String>> {
        let mut cached = self.names.lock().await;
        if let Some((cached_height, names)) = cached.as_ref() {
            if *cached_height == height {
                return Ok(names.clone());
            }
        }

        let block = self.blocks.get_block_by_height(height).await?;
        let url = format!("{}/records", self.base);
        let resp: RecordsResponse = get_json(&self.client, &url).await?;
        // BTreeMap keys are already sorted.
        let names: Vec<String> = resp
            .records
            .into_iter()
            .filter(|(_, record)| record.is_stable_at(block.timestamp))
            .map(|(name, _)| name)
            .collect();
        tracing::debug!(target: "lists", height, names = names.len(), "loaded name records");
        *cached = Some((height, names.clone()));
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observer_types::gateway::BlockInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BLOCK_TS: u64 = 10_000_000;

    struct Blocks(AtomicUsize);

    #[async_trait]
    impl BlockSource for Blocks {
        async fn get_block_by_height(&self, _height: u64) -> Result<BlockInfo> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(BlockInfo {
                indep_hash: None,
                timestamp: BLOCK_TS,
            })
        }
    }

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gateways"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "gateways": {
                    "wallet-b": { "settings": { "fqdn": "b.test" }, "start": 10, "end": 0 },
                    "wallet-a": { "settings": { "fqdn": "a.test" }, "start": 5, "end": 90 }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": {
                    "zeta": { "startTimestamp": 0 },
                    "alpha": { "startTimestamp": 0, "endTimestamp": BLOCK_TS + 10_000_000 },
                    "fresh": { "startTimestamp": BLOCK_TS - 60 },
                    "expiring": { "startTimestamp": 0, "endTimestamp": BLOCK_TS + 60 }
                }
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_gateways_map_to_hosts() {
        let server = server().await;
        let cache = RemoteCacheClient::new(
            server.uri(),
            Client::new(),
            Arc::new(Blocks(AtomicUsize::new(0))),
        );
        let hosts = cache.get_hosts().await.unwrap();
        assert_eq!(
            hosts,
            vec![
                GatewayHost {
                    start_height: Some(5),
                    end_height: Some(90),
                    ..GatewayHost::new("a.test", "wallet-a")
                },
                GatewayHost {
                    start_height: Some(10),
                    ..GatewayHost::new("b.test", "wallet-b")
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_names_filtered_sorted_and_cached() {
        let server = server().await;
        let blocks = Arc::new(Blocks(AtomicUsize::new(0)));
        let cache = RemoteCacheClient::new(server.uri(), Client::new(), blocks.clone());

        assert_eq!(
            cache.get_all_names(100).await.unwrap(),
            vec!["alpha".to_string(), "zeta".to_string()]
        );
        assert_eq!(cache.get_names_count(100).await.unwrap(), 2);
        assert_eq!(cache.get_name(100, 1).await.unwrap(), "zeta");
        assert_eq!(blocks.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gateway_without_fqdn_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gateways"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "gateways": { "wallet-a": { "settings": {} } }
            })))
            .mount(&server)
            .await;
        let cache = RemoteCacheClient::new(
            server.uri(),
            Client::new(),
            Arc::new(Blocks(AtomicUsize::new(0))),
        );
        assert!(matches!(
            cache.get_hosts().await,
            Err(ObserverError::UpstreamUnavailable(_))
        ));
    }
}
