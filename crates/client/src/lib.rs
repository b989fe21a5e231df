// Path: crates/client/src/lib.rs
//! # Observer Client Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Observer Client
//!
//! reqwest-backed implementations of the observer's collaborator traits: the
//! chain HTTP API, the ledger gateway, the contract-state cache, the upload
//! service, plus static lists and the local Ed25519 signer.

pub mod chain;
pub mod ledger;
pub mod lists;
pub mod remote_cache;
pub mod signer;
pub mod upload;

pub use chain::ChainClient;
pub use ledger::HttpLedgerClient;
pub use lists::{StaticGatewayList, StaticNameList};
pub use remote_cache::RemoteCacheClient;
pub use signer::Ed25519ReportSigner;
pub use upload::HttpUploadClient;

use observer_types::error::ObserverError;
use observer_types::Result;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds the shared HTTP client with connect and whole-request timeouts.
pub fn build_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ObserverError::Config(format!("http client: {e}")))
}

pub(crate) fn upstream(url: &str, e: impl std::fmt::Display) -> ObserverError {
    ObserverError::UpstreamUnavailable(format!("{url}: {e}"))
}

/// Sends `request` and decodes a JSON body, mapping transport and status
/// failures to `UpstreamUnavailable`.
pub(crate) async fn send_json<T: DeserializeOwned>(url: &str, request: RequestBuilder) -> Result<T> {
    let resp = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| upstream(url, e))?;
    resp.json::<T>()
        .await
        .map_err(|e| ObserverError::Serialization(format!("{url}: {e}")))
}

/// `GET url` decoded as JSON.
pub(crate) async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    send_json(url, client.get(url)).await
}
