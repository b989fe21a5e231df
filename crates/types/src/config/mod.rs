// Path: crates/types/src/config/mod.rs

//! Configuration for the observer node, loaded from a TOML file.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The full node configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObserverConfig {
    /// The observer's wallet address. Derived from `key_file` when absent.
    #[serde(default)]
    pub observer_address: Option<String>,
    /// Path to the hex-encoded Ed25519 seed used to sign uploads.
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Base URL of the chain HTTP API.
    #[serde(default = "default_chain_url")]
    pub chain_url: String,
    /// Host of the gateway whose resolutions are treated as ground truth.
    #[serde(default = "default_reference_gateway_host")]
    pub reference_gateway_host: String,
    /// Base URL of the ledger gateway. Without it the node runs unpublished.
    #[serde(default)]
    pub ledger_url: Option<String>,
    /// Base URL of the report upload service.
    #[serde(default)]
    pub upload_url: Option<String>,
    /// Base URL of a contract-state cache serving gateway and name records.
    #[serde(default)]
    pub remote_cache_url: Option<String>,
    /// URL scheme used for probes and info requests.
    #[serde(default = "default_gateway_scheme")]
    pub gateway_scheme: String,

    /// Hosts to observe instead of the ledger's gateway list.
    #[serde(default)]
    pub observed_gateway_hosts: Vec<String>,
    /// Names to sample from instead of the ledger's name registry.
    #[serde(default)]
    pub arns_names: Vec<String>,

    /// Names the observer selects itself per epoch.
    #[serde(default = "default_chosen_names_count")]
    pub chosen_names_count: usize,
    /// Prescribed names sampled per epoch when no ledger assigns them.
    #[serde(default = "default_prescribed_names_count")]
    pub prescribed_names_count: usize,
    /// Observers sampled per epoch when no ledger assigns them.
    #[serde(default = "default_observers_count")]
    pub observers_count: usize,
    /// Number of blocks hashed together for chain entropy.
    #[serde(default = "default_entropy_sampled_blocks")]
    pub entropy_sampled_blocks: u64,
    /// Distance below the requested height of the first sampled block.
    #[serde(default)]
    pub entropy_blocks_offset: u64,
    /// Where the private entropy is persisted.
    #[serde(default = "default_entropy_cache_path")]
    pub entropy_cache_path: PathBuf,

    /// The height epochs are anchored at.
    #[serde(default)]
    pub epoch_anchor_height: u64,
    /// Blocks per epoch.
    #[serde(default = "default_epoch_block_length")]
    pub epoch_block_length: u64,

    /// Blocks after the epoch start before publishing is allowed.
    #[serde(default = "default_early_margin_blocks")]
    pub early_margin_blocks: u64,
    /// Blocks before the epoch end after which publishing is refused.
    #[serde(default = "default_late_margin_blocks")]
    pub late_margin_blocks: u64,
    /// Seconds between report cycles.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// Directory of the filesystem report store.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Gateways assessed in parallel.
    #[serde(default = "default_gateway_assessment_concurrency")]
    pub gateway_assessment_concurrency: usize,
    /// Names assessed in parallel within one gateway.
    #[serde(default = "default_name_assessment_concurrency")]
    pub name_assessment_concurrency: usize,

    /// TCP connect timeout for every outbound request.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout for every outbound request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Attempts per ledger interaction before the sink gives up.
    #[serde(default = "default_ledger_write_max_attempts")]
    pub ledger_write_max_attempts: u32,
    /// Fixed delay between ledger interaction attempts.
    #[serde(default = "default_ledger_write_retry_delay_ms")]
    pub ledger_write_retry_delay_ms: u64,

    /// Sent as `X-AR-IO-Node-Release` to the reference gateway.
    #[serde(default)]
    pub node_release: Option<String>,
}

fn default_key_file() -> PathBuf {
    PathBuf::from("wallets/observer.key")
}
fn default_chain_url() -> String {
    "https://arweave.net".to_string()
}
fn default_reference_gateway_host() -> String {
    "arweave.dev".to_string()
}
fn default_gateway_scheme() -> String {
    "https".to_string()
}
fn default_chosen_names_count() -> usize {
    8
}
fn default_prescribed_names_count() -> usize {
    2
}
fn default_observers_count() -> usize {
    50
}
fn default_entropy_sampled_blocks() -> u64 {
    5
}
fn default_entropy_cache_path() -> PathBuf {
    PathBuf::from("data/tmp/observer/entropy")
}
fn default_epoch_block_length() -> u64 {
    5000
}
fn default_early_margin_blocks() -> u64 {
    100
}
fn default_late_margin_blocks() -> u64 {
    50
}
fn default_report_interval_secs() -> u64 {
    3600
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("data/reports")
}
fn default_gateway_assessment_concurrency() -> usize {
    10
}
fn default_name_assessment_concurrency() -> usize {
    5
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_ledger_write_max_attempts() -> u32 {
    3
}
fn default_ledger_write_retry_delay_ms() -> u64 {
    10_000
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            observer_address: None,
            key_file: default_key_file(),
            chain_url: default_chain_url(),
            reference_gateway_host: default_reference_gateway_host(),
            ledger_url: None,
            upload_url: None,
            remote_cache_url: None,
            gateway_scheme: default_gateway_scheme(),
            observed_gateway_hosts: Vec::new(),
            arns_names: Vec::new(),
            chosen_names_count: default_chosen_names_count(),
            prescribed_names_count: default_prescribed_names_count(),
            observers_count: default_observers_count(),
            entropy_sampled_blocks: default_entropy_sampled_blocks(),
            entropy_blocks_offset: 0,
            entropy_cache_path: default_entropy_cache_path(),
            epoch_anchor_height: 0,
            epoch_block_length: default_epoch_block_length(),
            early_margin_blocks: default_early_margin_blocks(),
            late_margin_blocks: default_late_margin_blocks(),
            report_interval_secs: default_report_interval_secs(),
            reports_dir: default_reports_dir(),
            gateway_assessment_concurrency: default_gateway_assessment_concurrency(),
            name_assessment_concurrency: default_name_assessment_concurrency(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            ledger_write_max_attempts: default_ledger_write_max_attempts(),
            ledger_write_retry_delay_ms: default_ledger_write_retry_delay_ms(),
            node_release: None,
        }
    }
}

impl ObserverConfig {
    /// Rejects combinations no cycle could run with.
    pub fn validate(&self) -> Result<(), crate::error::ObserverError> {
        use crate::error::ObserverError::Config;
        if self.epoch_block_length == 0 {
            return Err(Config("epoch_block_length must be positive".into()));
        }
        if self.early_margin_blocks + self.late_margin_blocks >= self.epoch_block_length {
            return Err(Config(
                "early_margin_blocks + late_margin_blocks must be below epoch_block_length".into(),
            ));
        }
        if self.gateway_assessment_concurrency == 0 || self.name_assessment_concurrency == 0 {
            return Err(Config("assessment concurrency must be positive".into()));
        }
        if self.entropy_sampled_blocks == 0 {
            return Err(Config("entropy_sampled_blocks must be positive".into()));
        }
        if self.ledger_write_max_attempts == 0 {
            return Err(Config("ledger_write_max_attempts must be positive".into()));
        }
        Ok(())
    }
}
