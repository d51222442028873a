// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use tracing::{debug, error, info, warn};
use zonesync::{
    config::{Cli, Config},
    metrics, reconciler,
    repository::FsRepository,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A single run only needs a couple of workers for the concurrent reads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("zonesync")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

/// Install the tracing subscriber.
///
/// Respects RUST_LOG (default `info`) and RUST_LOG_FORMAT (`json` or `text`).
/// Example: RUST_LOG=zonesync=debug RUST_LOG_FORMAT=json zonesync --dry-run
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    init_tracing();
    debug!("Logging initialized with file and line number tracking");

    let config = Config::from_cli(&cli).context("Invalid configuration")?;
    let options = config.sync_options();
    info!(
        zone = %config.zone,
        provider = config.provider_kind().as_str(),
        records_dir = %config.records_dir.display(),
        mode = options.mode.label(),
        dry_run = options.dry_run,
        "Starting zonesync"
    );

    let provider = config
        .build_provider()
        .context("Failed to initialize DNS provider")?;
    let source = FsRepository::new(&config.records_dir);
    let policy = config.policy();
    let today = Utc::now().date_naive();

    // The batch is sent in one phase; an interrupted run is corrected by the next one
    let result = tokio::select! {
        result = reconciler::run(&policy, &source, provider.as_ref(), &options, today) => result,
        () = shutdown_signal() => {
            warn!("Interrupted before the run finished");
            write_metrics(config.metrics_file.as_deref())?;
            anyhow::bail!("Reconciliation of {} interrupted", config.zone);
        }
    };

    write_metrics(config.metrics_file.as_deref())?;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(
                reason = e.status_reason(),
                transient = e.is_transient(),
                "Reconciliation failed: {}",
                e
            );
            return Err(e).with_context(|| format!("Reconciliation of {} failed", config.zone));
        }
    };

    report
        .outcome()
        .with_context(|| format!("Provider rejected changes to {}", config.zone))?;

    info!("Zone is in sync with the repository");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    () = wait_for_ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

/// Resolve on SIGINT; never resolves when no handler can be installed.
async fn wait_for_ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Write the Prometheus text exposition to `path`, if one is configured.
fn write_metrics(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let body = metrics::gather_metrics().context("Failed to encode metrics")?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    debug!(path = %path.display(), "Wrote metrics");
    Ok(())
}
