// Path: crates/node/src/wiring.rs
//! Builds the observer's dependency graph from configuration.
//!
//! Entropy roles:
//! - chain entropy alone seeds everything other observers must be able to
//!   reproduce (prescribed names and observers when no ledger is configured);
//! - the composite of a persisted local secret and chain entropy seeds this
//!   observer's own choices (chosen names, byte ranges, publish height).

use anyhow::{anyhow, Result};
use observer_api::chain::{BlockSource, HeightSource};
use observer_api::entropy::EntropySource;
use observer_api::epoch::EpochSource;
use observer_api::lists::{GatewayListSource, NameListSource, NamesSource, ObserverListSource};
use observer_api::publish::{ReportSigner, ReportStore};
use observer_client::{
    build_http_client, ChainClient, Ed25519ReportSigner, HttpLedgerClient, HttpUploadClient,
    RemoteCacheClient, StaticGatewayList, StaticNameList,
};
use observer_core::driver::ObserverDriver;
use observer_core::entropy::{
    CachedEntropySource, ChainEntropySource, CompositeEntropySource, RandomEntropySource,
};
use observer_core::epochs::{EpochParams, LedgerEpochSource, StaticEpochSource};
use observer_core::pipeline::{
    FsReportStore, LedgerReportSink, NamedSink, PipelineReportSink, UploadReportSink,
};
use observer_core::prober::{HttpProber, ProberConfig};
use observer_core::report::{ReportBuilder, ReportBuilderConfig, ReportSources};
use observer_core::retry::RetryPolicy;
use observer_core::scheduler::{PublishScheduler, PublishWindow};
use observer_core::selection::{RandomNamesSource, RandomObserversSource};
use observer_types::config::ObserverConfig;
use std::sync::Arc;
use std::time::Duration;

/// The wired node.
pub struct ObserverNode {
    /// The periodic cycle.
    pub driver: ObserverDriver,
    /// Read access to persisted reports.
    pub store: Arc<dyn ReportStore>,
    /// The address reports are attributed to.
    pub observer_address: String,
}

/// Wires every component named by `config`.
///
/// Reads the key file; performs no network I/O.
pub async fn build(config: &ObserverConfig) -> Result<ObserverNode> {
    let client = build_http_client(
        Duration::from_millis(config.connect_timeout_ms),
        Duration::from_millis(config.request_timeout_ms),
    )?;
    let chain = Arc::new(ChainClient::new(config.chain_url.as_str(), client.clone()));
    let heights: Arc<dyn HeightSource> = chain.clone();
    let blocks: Arc<dyn BlockSource> = chain;

    let signer = Arc::new(Ed25519ReportSigner::from_file(&config.key_file).await?);
    let observer_address = config
        .observer_address
        .clone()
        .unwrap_or_else(|| signer.address());

    let chain_entropy: Arc<dyn EntropySource> = Arc::new(ChainEntropySource::new(
        heights.clone(),
        blocks.clone(),
        config.entropy_sampled_blocks,
        config.entropy_blocks_offset,
    ));
    let local_secret: Arc<dyn EntropySource> = Arc::new(CachedEntropySource::new(
        Arc::new(RandomEntropySource),
        config.entropy_cache_path.clone(),
    ));
    let cycle_entropy: Arc<dyn EntropySource> = Arc::new(CompositeEntropySource::new(vec![
        local_secret,
        chain_entropy.clone(),
    ]));

    let ledger = config
        .ledger_url
        .as_deref()
        .map(|url| Arc::new(HttpLedgerClient::new(url, client.clone())));
    let remote_cache = config
        .remote_cache_url
        .as_deref()
        .map(|url| Arc::new(RemoteCacheClient::new(url, client.clone(), blocks.clone())));

    let epochs: Arc<dyn EpochSource> = match &ledger {
        Some(ledger) => Arc::new(LedgerEpochSource::new(
            ledger.clone(),
            heights.clone(),
            blocks.clone(),
        )),
        None => Arc::new(StaticEpochSource::new(
            EpochParams::new(config.epoch_anchor_height, config.epoch_block_length)?,
            heights.clone(),
            blocks.clone(),
        )),
    };

    let gateways: Arc<dyn GatewayListSource> = if !config.observed_gateway_hosts.is_empty() {
        Arc::new(StaticGatewayList::new(config.observed_gateway_hosts.clone()))
    } else if let Some(ledger) = &ledger {
        ledger.clone()
    } else if let Some(cache) = &remote_cache {
        cache.clone()
    } else {
        return Err(anyhow!(
            "no gateway list: set observed_gateway_hosts, ledger_url or remote_cache_url"
        ));
    };

    let names: Arc<dyn NameListSource> = if !config.arns_names.is_empty() {
        Arc::new(StaticNameList::new(config.arns_names.clone()))
    } else if let Some(cache) = &remote_cache {
        cache.clone()
    } else {
        return Err(anyhow!("no name list: set arns_names or remote_cache_url"));
    };

    let prescribed_names: Arc<dyn NamesSource> = match &ledger {
        Some(ledger) => ledger.clone(),
        None => Arc::new(RandomNamesSource::new(
            names.clone(),
            chain_entropy.clone(),
            config.prescribed_names_count,
        )),
    };
    let chosen_names: Arc<dyn NamesSource> = Arc::new(RandomNamesSource::new(
        names,
        cycle_entropy.clone(),
        config.chosen_names_count,
    ));
    let observers: Arc<dyn ObserverListSource> = match &ledger {
        Some(ledger) => ledger.clone(),
        None => Arc::new(RandomObserversSource::new(
            gateways.clone(),
            chain_entropy,
            config.observers_count,
        )),
    };

    let prober = Arc::new(HttpProber::with_client(
        client.clone(),
        ProberConfig {
            scheme: config.gateway_scheme.clone(),
            node_release: config.node_release.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            ..ProberConfig::default()
        },
    ));

    let builder = ReportBuilder::new(
        ReportBuilderConfig {
            observer_address: observer_address.clone(),
            reference_gateway_host: config.reference_gateway_host.clone(),
            gateway_concurrency: config.gateway_assessment_concurrency,
            name_concurrency: config.name_assessment_concurrency,
        },
        ReportSources {
            epochs,
            gateways,
            prescribed_names,
            chosen_names,
            entropy: cycle_entropy.clone(),
            prober,
        },
    );

    let scheduler = PublishScheduler::new(
        observer_address.clone(),
        observers,
        heights,
        cycle_entropy,
        PublishWindow::new(
            config.epoch_block_length,
            config.early_margin_blocks,
            config.late_margin_blocks,
        )?,
    );

    let store = Arc::new(FsReportStore::new(config.reports_dir.clone()));
    let mut sinks = vec![NamedSink::new("fs", store.clone())];
    if let Some(upload_url) = &config.upload_url {
        let uploads = Arc::new(HttpUploadClient::new(
            upload_url.as_str(),
            config.chain_url.as_str(),
            client.clone(),
        ));
        sinks.push(NamedSink::new(
            "upload",
            Arc::new(UploadReportSink::new(uploads, signer, env!("CARGO_PKG_VERSION"))),
        ));
    }
    if let Some(ledger) = ledger {
        sinks.push(NamedSink::new(
            "ledger",
            Arc::new(LedgerReportSink::new(
                ledger,
                observer_address.clone(),
                RetryPolicy::fixed(
                    config.ledger_write_max_attempts,
                    Duration::from_millis(config.ledger_write_retry_delay_ms),
                ),
            )),
        ));
    }
    tracing::info!(
        target: "node",
        observer_address = %observer_address,
        sinks = sinks.len(),
        ledger = config.ledger_url.is_some(),
        "observer wired"
    );

    Ok(ObserverNode {
        driver: ObserverDriver::new(builder, scheduler, Arc::new(PipelineReportSink::new(sinks))),
        store,
        observer_address,
    })
}
