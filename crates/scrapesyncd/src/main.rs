//! scrapesyncd — the scrapesync daemon.
//!
//! Single binary that assembles the pipeline:
//! - Docker runtime connection
//! - Event log (the producer/consumer hand-off)
//! - Reconciler loop on its own task
//! - Producer manager on the main task (snapshot once, then the
//!   lifecycle stream forever)
//!
//! # Usage
//!
//! ```text
//! scrapesyncd run --targets-file prometheus-local/prometheus.yaml \
//!                 --reload-url http://localhost:9090/-/reload
//! ```
//!
//! The process has no internal supervisor: if the lifecycle subscription
//! ends, the daemon exits and relies on its external restart policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use scrapesync_core::EventLog;
use scrapesync_docker::DockerRuntime;
use scrapesync_producer::ProducerManager;
use scrapesync_reconcile::{ReconcileConfig, Reconciler, ReloadClient};
use scrapesync_targets::TargetsFile;

#[derive(Parser)]
#[command(name = "scrapesyncd", about = "Docker scrape-target discovery for Prometheus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the discovery/reconciliation pipeline.
    Run(RunOptions),
}

#[derive(Args)]
struct RunOptions {
    /// Path of the Prometheus target file this daemon owns.
    #[arg(long, default_value = "prometheus-local/prometheus.yaml")]
    targets_file: PathBuf,

    /// Prometheus reload endpoint.
    #[arg(long, default_value = "http://localhost:9090/-/reload")]
    reload_url: String,

    /// Reconciliation interval in seconds.
    #[arg(long, default_value = "60")]
    interval: u64,

    /// Label workloads use to opt in to scraping.
    #[arg(long, default_value = "scrape_target")]
    label: String,

    /// Container port workloads expose metrics on.
    #[arg(long, default_value = "2112/tcp")]
    metrics_port: String,

    /// Host under which targets are published to the scraper.
    #[arg(long, default_value = "host.docker.internal")]
    publish_host: String,

    /// Global scrape interval written to the target file.
    #[arg(long, default_value = "60s")]
    scrape_interval: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scrapesyncd=debug,scrapesync=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(options) => run(options).await,
    }
}

async fn run(options: RunOptions) -> anyhow::Result<()> {
    info!("scrapesync daemon starting");

    // The first publish must not fail on a missing directory.
    if let Some(parent) = options.targets_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // ── Initialize subsystems ──────────────────────────────────

    let runtime = Arc::new(DockerRuntime::connect()?);
    info!("docker runtime connected");

    let log = EventLog::new();

    let interval = Duration::from_secs(options.interval);
    let reconciler = Reconciler::new(
        runtime.clone(),
        TargetsFile::new(&options.targets_file, &options.scrape_interval),
        ReloadClient::new(&options.reload_url, Duration::from_millis(500)),
        ReconcileConfig {
            publish_host: options.publish_host,
            metrics_port: options.metrics_port,
            inspect_timeout: Duration::from_millis(500),
        },
    );
    info!(
        targets_file = ?options.targets_file,
        reload_url = %options.reload_url,
        interval_secs = interval.as_secs(),
        "reconciler initialized"
    );

    let manager = ProducerManager::new(runtime, &options.label);
    info!(label = %options.label, "producers initialized");

    // ── Start the pipeline ─────────────────────────────────────

    // Reconciliation loop on its own task.
    let reconcile_log = log.clone();
    tokio::spawn(async move {
        reconciler.run(reconcile_log, interval).await;
    });

    // Producers own the main task: the snapshot runs once, then the
    // stream producer blocks here for the process lifetime.
    manager.run(&log).await;

    // Only reached if the lifecycle subscription ended; exit and let the
    // supervisor restart us.
    info!("producers finished, shutting down");
    Ok(())
}
