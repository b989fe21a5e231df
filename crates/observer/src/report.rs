// Path: crates/observer/src/report.rs
//! Assembles one observer report per cycle.

use crate::assessor::GatewayAssessor;
use crate::now_secs;
use futures::stream::{self, StreamExt};
use observer_api::entropy::{EntropyContext, EntropySource};
use observer_api::epoch::EpochSource;
use observer_api::lists::{GatewayListSource, NamesSource};
use observer_api::probe::ResolutionProber;
use observer_telemetry::observer_metrics;
use observer_types::report::{ObserverReport, REPORT_FORMAT_VERSION};
use observer_types::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Identity and fan-out settings for the report builder.
#[derive(Debug, Clone)]
pub struct ReportBuilderConfig {
    /// Written into every report.
    pub observer_address: String,
    /// The host treated as ground truth.
    pub reference_gateway_host: String,
    /// Gateways assessed in parallel.
    pub gateway_concurrency: usize,
    /// Names assessed in parallel within one gateway.
    pub name_concurrency: usize,
}

/// The collaborators a report cycle reads from.
pub struct ReportSources {
    /// Resolves the current epoch.
    pub epochs: Arc<dyn EpochSource>,
    /// Lists the gateways to assess.
    pub gateways: Arc<dyn GatewayListSource>,
    /// Names every observer must check.
    pub prescribed_names: Arc<dyn NamesSource>,
    /// Names this observer chose.
    pub chosen_names: Arc<dyn NamesSource>,
    /// Seeds byte-range selection for the cycle.
    pub entropy: Arc<dyn EntropySource>,
    /// Performs the HTTP probes.
    pub prober: Arc<dyn ResolutionProber>,
}

/// Builds [`ObserverReport`]s.
pub struct ReportBuilder {
    config: ReportBuilderConfig,
    sources: ReportSources,
}

impl ReportBuilder {
    /// Builds the report builder.
    pub fn new(config: ReportBuilderConfig, sources: ReportSources) -> Self {
        Self { config, sources }
    }

    /// Runs one cycle: resolves the epoch, name lists, entropy and gateways
    /// once, then assesses every gateway.
    ///
    /// Only the shared setup can fail; gateway and name failures are recorded
    /// in the report.
    pub async fn generate_report(&self) -> Result<ObserverReport> {
        let epoch = self.sources.epochs.current_epoch().await?;
        let (prescribed_names, chosen_names) = tokio::try_join!(
            self.sources.prescribed_names.get_names(&epoch),
            self.sources.chosen_names.get_names(&epoch)
        )?;
        let entropy = self
            .sources
            .entropy
            .get_entropy(EntropyContext::at_height(epoch.start_height))
            .await?;

        let mut wallets_by_fqdn: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for host in self.sources.gateways.get_hosts().await? {
            if !host.is_active_at(epoch.start_height) {
                continue;
            }
            wallets_by_fqdn
                .entry(host.fqdn)
                .or_default()
                .insert(host.wallet);
        }
        tracing::info!(
            target: "report",
            epoch_index = epoch.index,
            epoch_start_height = epoch.start_height,
            gateways = wallets_by_fqdn.len(),
            prescribed = prescribed_names.len(),
            chosen = chosen_names.len(),
            "generating report"
        );

        let assessor = GatewayAssessor::new(
            self.sources.prober.clone(),
            self.config.reference_gateway_host.clone(),
            entropy,
            self.config.name_concurrency,
        );
        let assessor = &assessor;
        let (prescribed, chosen) = (&prescribed_names, &chosen_names);
        let gateway_assessments = stream::iter(wallets_by_fqdn)
            .map(|(fqdn, wallets)| async move {
                let assessment = assessor.assess(&fqdn, &wallets, prescribed, chosen).await;
                (fqdn, assessment)
            })
            .buffer_unordered(self.config.gateway_concurrency.max(1))
            .collect::<BTreeMap<_, _>>()
            .await;

        observer_metrics().inc_reports_generated();
        Ok(ObserverReport {
            format_version: REPORT_FORMAT_VERSION,
            observer_address: self.config.observer_address.clone(),
            epoch_index: epoch.index,
            epoch_start_height: epoch.start_height,
            epoch_start_timestamp: epoch.start_timestamp,
            epoch_end_timestamp: epoch.end_timestamp,
            generated_at: now_secs(),
            gateway_assessments,
        })
    }
}
