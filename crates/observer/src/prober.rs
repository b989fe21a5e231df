// Path: crates/observer/src/prober.rs
//! Fingerprints one name's resolution on one host over HTTP.
//!
//! Content up to [`MAX_STREAMED_BYTES`] is hashed from a single streamed
//! `GET`, capped at that many bytes. Larger content is sampled with range
//! requests at offsets drawn from the shared epoch entropy, so the reference
//! and the gateway hash the same bytes.

use crate::sampler::{select_ranges, HashPrng};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use observer_api::probe::{ProbeTarget, ResolutionProber};
use observer_types::error::ObserverError;
use observer_types::resolution::{ProbeTimings, ResolutionFingerprint};
use observer_types::{Entropy, Result, MAX_STREAMED_BYTES};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Header carrying the resolved transaction id.
pub const RESOLVED_ID_HEADER: &str = "x-arns-resolved-id";
/// Header carrying the resolution TTL.
pub const TTL_SECONDS_HEADER: &str = "x-arns-ttl-seconds";
/// Header identifying the observer release to the reference gateway.
pub const NODE_RELEASE_HEADER: &str = "x-ar-io-node-release";

/// Tunables for [`HttpProber`].
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// `http` or `https`.
    pub scheme: String,
    /// Sent to the reference gateway only.
    pub node_release: Option<String>,
    /// Bytes per sampled range.
    pub range_size: u64,
    /// Ranges sampled per large resource.
    pub range_quantity: usize,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            node_release: None,
            range_size: 200,
            range_quantity: 5,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayInfo {
    wallet: Option<String>,
}

/// The reqwest-backed [`ResolutionProber`].
pub struct HttpProber {
    client: Client,
    config: ProberConfig,
}

impl HttpProber {
    /// Builds a prober with its own client honouring the configured timeouts.
    pub fn new(config: ProberConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ObserverError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Builds a prober over an existing client.
    pub fn with_client(client: Client, config: ProberConfig) -> Self {
        Self { client, config }
    }

    fn request(&self, method: Method, url: &str, target: ProbeTarget) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match (&self.config.node_release, target) {
            (Some(release), ProbeTarget::Reference) => {
                builder.header(NODE_RELEASE_HEADER, release.as_str())
            }
            _ => builder,
        }
    }

    // Returns `None` when the host does not have the content.
    async fn hash_stream(&self, url: &str, target: ProbeTarget) -> Result<Option<(String, Option<String>)>> {
        let mut response = self
            .request(Method::GET, url, target)
            .send()
            .await
            .map_err(|e| probe_error(url, e))?;
        if !check_status(url, &response)? {
            return Ok(None);
        }
        let content_type = header_string(&response, CONTENT_TYPE.as_str());

        let mut hasher = Sha256::new();
        let mut remaining = MAX_STREAMED_BYTES;
        while remaining > 0 {
            let Some(chunk) = response.chunk().await.map_err(|e| probe_error(url, e))? else {
                break;
            };
            let take = remaining.min(chunk.len() as u64);
            if let Some(part) = chunk.get(..take as usize) {
                hasher.update(part);
            }
            remaining -= take;
        }
        // Dropping the response aborts the remainder of an oversized body.
        drop(response);

        Ok(Some((URL_SAFE_NO_PAD.encode(hasher.finalize()), content_type)))
    }

    async fn hash_ranges(
        &self,
        url: &str,
        content_length: u64,
        entropy: &Entropy,
        target: ProbeTarget,
    ) -> Result<Option<(String, Option<String>)>> {
        let mut prng = HashPrng::new(entropy.as_bytes());
        let ranges = select_ranges(
            content_length,
            self.config.range_size,
            self.config.range_quantity,
            || prng.next_unit(),
        );

        let mut hasher = Sha256::new();
        let mut content_type = None;
        for range in ranges {
            let mut response = self
                .request(Method::GET, url, target)
                .header(RANGE, range.header_value())
                .send()
                .await
                .map_err(|e| probe_error(url, e))?;
            if !check_status(url, &response)? {
                return Ok(None);
            }
            content_type = header_string(&response, CONTENT_TYPE.as_str());

            let mut remaining = self.config.range_size;
            while remaining > 0 {
                let Some(chunk) = response.chunk().await.map_err(|e| probe_error(url, e))? else {
                    break;
                };
                let take = remaining.min(chunk.len() as u64);
                if let Some(part) = chunk.get(..take as usize) {
                    hasher.update(part);
                }
                remaining -= take;
            }
        }

        Ok(Some((URL_SAFE_NO_PAD.encode(hasher.finalize()), content_type)))
    }
}

fn probe_error(url: &str, e: reqwest::Error) -> ObserverError {
    ObserverError::ProbeFailed(format!("request to {url} failed: {e}"))
}

// `Ok(false)` for 404, an error for any other non-success status.
fn check_status(url: &str, response: &Response) -> Result<bool> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !status.is_success() {
        return Err(ObserverError::ProbeFailed(format!(
            "{url} returned status {status}"
        )));
    }
    Ok(true)
}

fn header_string(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[async_trait]
impl ResolutionProber for HttpProber {
    async fn probe(
        &self,
        host: &str,
        name: &str,
        entropy: &Entropy,
        reference_content_length: Option<u64>,
        target: ProbeTarget,
    ) -> Result<ResolutionFingerprint> {
        let url = format!("{}://{}.{}/", self.config.scheme, name, host);
        let started = Instant::now();

        let head = self
            .request(Method::HEAD, &url, target)
            .send()
            .await
            .map_err(|e| probe_error(&url, e))?;
        let head_ms = elapsed_ms(started);
        if !check_status(&url, &head)? {
            return Ok(ResolutionFingerprint::not_found(ProbeTimings {
                head_ms,
                fetch_ms: 0,
                total_ms: head_ms,
            }));
        }

        let status_code = head.status().as_u16();
        let resolved_id = header_string(&head, RESOLVED_ID_HEADER);
        let ttl_seconds = header_string(&head, TTL_SECONDS_HEADER);
        let header_length = header_string(&head, CONTENT_LENGTH.as_str()).and_then(|v| v.parse::<u64>().ok());
        let content_length = reference_content_length.or(header_length);

        let fetch_started = Instant::now();
        let hashed = match content_length {
            Some(length) if length > MAX_STREAMED_BYTES => {
                self.hash_ranges(&url, length, entropy, target).await?
            }
            _ => self.hash_stream(&url, target).await?,
        };
        let timings = ProbeTimings {
            head_ms,
            fetch_ms: elapsed_ms(fetch_started),
            total_ms: elapsed_ms(started),
        };

        let Some((digest, content_type)) = hashed else {
            return Ok(ResolutionFingerprint::not_found(timings));
        };
        tracing::debug!(target: "prober", %url, ?target, content_length, "probed resolution");
        Ok(ResolutionFingerprint {
            status_code: Some(status_code),
            resolved_id,
            ttl_seconds,
            content_type,
            content_length,
            data_hash_digest: Some(digest),
            timings: Some(timings),
        })
    }

    async fn observed_wallet(&self, fqdn: &str) -> Result<Option<String>> {
        let url = format!("{}://{}/ar-io/info", self.config.scheme, fqdn);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| probe_error(&url, e))?;
        if !response.status().is_success() {
            return Err(ObserverError::ProbeFailed(format!(
                "{url} returned status {}",
                response.status()
            )));
        }
        let info: GatewayInfo = response
            .json()
            .await
            .map_err(|e| ObserverError::ProbeFailed(format!("invalid info from {url}: {e}")))?;
        Ok(info.wallet)
    }
}
