// Path: crates/api/src/publish.rs

use async_trait::async_trait;
use observer_types::report::{ObserverReport, ReportInfo};
use observer_types::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stage of the publish pipeline.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Saves the report, returning the (possibly enriched) info for the next
    /// stage.
    async fn save_report(&self, info: ReportInfo) -> Result<ReportInfo>;
}

/// Read access to persisted reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Returns the report persisted for the epoch starting at
    /// `epoch_start_height`, if any.
    async fn get_report(&self, epoch_start_height: u64) -> Result<Option<ObserverReport>>;

    /// Returns the persisted report with the highest epoch start height.
    async fn latest_report(&self) -> Result<Option<ObserverReport>>;
}

/// A name/value tag attached to uploads and ledger interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// The tag name.
    pub name: String,
    /// The tag value.
    pub value: String,
}

impl Tag {
    /// Builds a tag.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The observations the ledger already records for one epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochObservations {
    /// Failed gateway wallet to the observers that reported it.
    #[serde(default)]
    pub failure_summaries: BTreeMap<String, Vec<String>>,
    /// Observer address to the report id it submitted.
    #[serde(default)]
    pub reports: BTreeMap<String, String>,
}

/// One observation submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationInteraction {
    /// The uploaded report the observation refers to.
    pub observer_report_tx_id: String,
    /// The wallets reported as failed in this chunk.
    pub failed_gateways: Vec<String>,
    /// Tags attached to the interaction.
    pub tags: Vec<Tag>,
}

/// Reads and writes observer state on the ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Returns what the ledger records for the epoch starting at
    /// `epoch_start_height`.
    async fn epoch_observations(&self, epoch_start_height: u64) -> Result<EpochObservations>;

    /// Submits one interaction and returns its id.
    async fn save_observations(&self, interaction: &ObservationInteraction) -> Result<String>;
}

/// A signed payload ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    /// The payload bytes.
    pub data: Vec<u8>,
    /// Tags describing the payload.
    pub tags: Vec<Tag>,
    /// The signer's public key.
    pub owner: Vec<u8>,
    /// The signature over the payload.
    pub signature: Vec<u8>,
}

/// A content-addressed upload service.
#[async_trait]
pub trait UploadClient: Send + Sync {
    /// Returns the id of an upload by `owner_address` carrying every tag in
    /// `tags`, if one exists.
    async fn find_upload(&self, owner_address: &str, tags: &[Tag]) -> Result<Option<String>>;

    /// Uploads `item` and returns its content address.
    async fn upload(&self, item: UploadItem) -> Result<String>;
}

/// Opaque signing identity.
#[async_trait]
pub trait ReportSigner: Send + Sync {
    /// The wallet address derived from the key.
    fn address(&self) -> String;

    /// The raw public key.
    fn public_key(&self) -> Vec<u8>;

    /// Signs `message`.
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}
