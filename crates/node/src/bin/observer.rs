// Path: crates/node/src/bin/observer.rs
#![forbid(unsafe_code)]

use anyhow::{anyhow, Result};
use clap::Parser;
use observer_core::driver::CycleOutcome;
use observer_node::{load_config, wiring};
use observer_telemetry::init::{LogFormat, LogOptions, DEFAULT_LOG_FILTER};
use observer_types::error::ErrorCode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for the observer binary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ObserverOpts {
    /// Path to the observer.toml configuration file.
    #[arg(long, default_value = "config/observer.toml")]
    config: PathBuf,

    /// Run a single report cycle and exit.
    #[arg(long)]
    once: bool,

    /// Address serving /metrics, /healthz and /readyz.
    #[arg(long, env = "TELEMETRY_ADDR", default_value = "127.0.0.1:9615")]
    telemetry_addr: SocketAddr,

    /// Log output format: json or pretty.
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = ObserverOpts::parse();
    observer_telemetry::init::init_tracing(&LogOptions {
        format: opts.log_format,
        default_filter: opts.log_filter.clone(),
    })?;
    let metrics_sink = observer_telemetry::prometheus::install()?;
    observer_telemetry::sinks::SINK
        .set(metrics_sink)
        .map_err(|_| anyhow!("metrics sink already installed"))?;

    tokio::spawn(observer_telemetry::http::run_server(opts.telemetry_addr));
    tracing::info!(
        target: "node",
        event = "startup",
        config = ?opts.config
    );

    let config = load_config(&opts.config)?;
    let node = wiring::build(&config).await?;

    match node.store.latest_report().await {
        Ok(Some(report)) => tracing::info!(
            target: "node",
            epoch_index = report.epoch_index,
            epoch_start_height = report.epoch_start_height,
            gateways = report.gateway_assessments.len(),
            "latest persisted report"
        ),
        Ok(None) => tracing::info!(target: "node", "no persisted reports"),
        Err(e) => tracing::warn!(target: "node", error = %e, "could not read persisted reports"),
    }
    observer_telemetry::http::mark_ready();

    if opts.once {
        return match node.driver.run_once().await {
            Ok(CycleOutcome::Published(info)) => {
                tracing::info!(
                    target: "node",
                    epoch_start_height = info.report.epoch_start_height,
                    report_tx_id = ?info.report_tx_id,
                    interaction_tx_ids = ?info.interaction_tx_ids,
                    "report published"
                );
                Ok(())
            }
            Ok(CycleOutcome::Skipped(reason)) => {
                tracing::info!(target: "node", reason = ?reason, "report not published");
                Ok(())
            }
            Err(e) => Err(anyhow!("report cycle failed ({}): {e}", e.code())),
        };
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "node", error = %e, "failed to install CTRL+C handler");
            // Keep the sender alive so the loop is not stopped by a closed channel.
            std::future::pending::<()>().await;
        }
        tracing::info!(target: "node", "shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    node.driver
        .run_forever(Duration::from_secs(config.report_interval_secs), shutdown_rx)
        .await;
    Ok(())
}
