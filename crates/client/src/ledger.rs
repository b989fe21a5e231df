// Path: crates/client/src/ledger.rs
//! The ledger gateway: epochs, prescribed lists, registered gateways and
//! observation submissions.

use crate::remote_cache::GatewaysResponse;
use crate::{get_json, send_json};
use async_trait::async_trait;
use observer_api::epoch::LedgerEpochReader;
use observer_api::lists::{GatewayListSource, NamesSource, ObserverListSource};
use observer_api::publish::{EpochObservations, LedgerClient, ObservationInteraction};
use observer_core::retry::RetryPolicy;
use observer_types::epoch::Epoch;
use observer_types::gateway::GatewayHost;
use observer_types::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpochResponse {
    epoch_index: u64,
    start_height: u64,
    start_timestamp: u64,
    end_timestamp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrescribedObserver {
    observer_address: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    id: String,
}

/// Reads go through a bounded exponential retry; writes are attempted once
/// and left to the caller's retry policy.
pub struct HttpLedgerClient {
    base: String,
    client: Client,
    read_retry: RetryPolicy,
}

impl HttpLedgerClient {
    /// A client for the ledger gateway at `base` with the default read retry.
    pub fn new(base: impl Into<String>, client: Client) -> Self {
        Self::with_read_retry(
            base,
            client,
            RetryPolicy::exponential(5, Duration::from_millis(500), Duration::from_secs(8)),
        )
    }

    /// A client with an explicit read retry policy.
    pub fn with_read_retry(base: impl Into<String>, client: Client, read_retry: RetryPolicy) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
            read_retry,
        }
    }

    async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base);
        self.read_retry
            .run(&url, || get_json::<T>(&self.client, &url))
            .await
    }
}

#[async_trait]
impl LedgerEpochReader for HttpLedgerClient {
    async fn ledger_epoch(&self) -> Result<Epoch> {
        let epoch: EpochResponse = self.read("/epoch").await?;
        Ok(Epoch {
            index: epoch.epoch_index,
            start_height: epoch.start_height,
            start_timestamp: epoch.start_timestamp,
            end_timestamp: epoch.end_timestamp,
        })
    }
}

#[async_trait]
impl GatewayListSource for HttpLedgerClient {
    async fn get_hosts(&self) -> Result<Vec<GatewayHost>> {
        let resp: GatewaysResponse = self.read("/gateways").await?;
        resp.into_hosts()
    }
}

#[async_trait]
impl NamesSource for HttpLedgerClient {
    async fn get_names(&self, epoch: &Epoch) -> Result<Vec<String>> {
        self.read(&format!("/epochs/{}/prescribed-names", epoch.start_height))
            .await
    }
}

#[async_trait]
impl ObserverListSource for HttpLedgerClient {
    async fn get_observers(&self, epoch: &Epoch) -> Result<Vec<String>> {
        let observers: Vec<PrescribedObserver> = self
            .read(&format!("/epochs/{}/prescribed-observers", epoch.start_height))
            .await?;
        Ok(observers.into_iter().map(|o| o.observer_address).collect())
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn epoch_observations(&self, epoch_start_height: u64) -> Result<EpochObservations> {
        self.read(&format!("/epochs/{epoch_start_height}/observations"))
            .await
    }

    async fn save_observations(&self, interaction: &ObservationInteraction) -> Result<String> {
        let url = format!("{}/observations", self.base);
        let resp: SubmissionResponse =
            send_json(&url, self.client.post(&url).json(interaction)).await?;
        Ok(resp.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observer_api::publish::Tag;
    use observer_types::error::ObserverError;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpLedgerClient {
        HttpLedgerClient::with_read_retry(
            server.uri(),
            Client::new(),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
        )
    }

    fn epoch() -> Epoch {
        Epoch {
            index: 4,
            start_height: 20_000,
            start_timestamp: 1,
            end_timestamp: 2,
        }
    }

    #[tokio::test]
    async fn test_reads_epoch_and_prescribed_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/epoch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "epochIndex": 4,
                "startHeight": 20000,
                "startTimestamp": 1,
                "endTimestamp": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/epochs/20000/prescribed-names"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["ardrive", "arns"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/epochs/20000/prescribed-observers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "observerAddress": "obs-1", "gatewayAddress": "gw-1" },
                { "observerAddress": "obs-2", "gatewayAddress": "gw-2" }
            ])))
            .mount(&server)
            .await;

        let ledger = client(&server);
        assert_eq!(ledger.ledger_epoch().await.unwrap(), epoch());
        assert_eq!(ledger.get_names(&epoch()).await.unwrap(), vec!["ardrive", "arns"]);
        assert_eq!(ledger.get_observers(&epoch()).await.unwrap(), vec!["obs-1", "obs-2"]);
    }

    #[tokio::test]
    async fn test_reads_retry_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/epochs/20000/observations"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/epochs/20000/observations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "failureSummaries": { "wallet-a": ["obs-1"] },
                "reports": { "obs-1": "tx-1" }
            })))
            .mount(&server)
            .await;

        let observations = client(&server).epoch_observations(20_000).await.unwrap();
        assert_eq!(observations.failure_summaries["wallet-a"], vec!["obs-1"]);
        assert_eq!(observations.reports["obs-1"], "tx-1");
    }

    #[tokio::test]
    async fn test_reads_give_up_after_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;
        let err = client(&server).ledger_epoch().await.unwrap_err();
        assert!(matches!(err, ObserverError::MaxRetriesExceeded { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_submits_observation() {
        let server = MockServer::start().await;
        let interaction = ObservationInteraction {
            observer_report_tx_id: "report-tx".into(),
            failed_gateways: vec!["wallet-a".into()],
            tags: vec![Tag::new("AR-IO-Component", "observer")],
        };
        Mock::given(method("POST"))
            .and(path("/observations"))
            .and(body_json(serde_json::json!({
                "observerReportTxId": "report-tx",
                "failedGateways": ["wallet-a"],
                "tags": [{ "name": "AR-IO-Component", "value": "observer" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "interaction-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).save_observations(&interaction).await.unwrap();
        assert_eq!(id, "interaction-1");
    }
}
