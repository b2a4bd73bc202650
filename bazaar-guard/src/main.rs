#![forbid(unsafe_code)]

use bazaar_guard_lib::config::{load_from_path, Config};
use bazaar_guard_lib::guard::Guard;
use bazaar_guard_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use bazaar_guard_lib::{api, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Marketplace behavior guard")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "BAZAAR_GUARD_CONFIG",
        default_value = "config/bazaar-guard.toml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", cli.config.display());
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging, &cfg.telemetry) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(listen = %cfg.listen, remote = cfg.remote.is_some(), "configuration loaded");

    if let Err(err) = run(cfg).await {
        error!(%err, "guard exited with error");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let mut guard = Guard::from_config(&cfg)?;
    let shutdown = CancellationToken::new();

    let metrics_registry = match cfg.telemetry.metrics_port {
        Some(_) => match init_metrics() {
            Ok((metrics, registry)) => {
                guard = guard.with_metrics(metrics);
                Some(registry)
            }
            Err(err) => {
                warn!(%err, "failed to initialize metrics, continuing without them");
                None
            }
        },
        None => None,
    };
    let guard = Arc::new(guard);

    let observability = match (cfg.telemetry.metrics_port, metrics_registry) {
        (Some(port), Some(registry)) => {
            let guard = guard.clone();
            let shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(err) = start_observability_server(port, registry, guard, shutdown).await
                {
                    error!(%err, "observability server failed");
                }
            }))
        }
        _ => None,
    };

    let sweeper = spawn_sweeper(&cfg, guard.clone(), shutdown.clone());
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let result = api::run(&cfg, guard, shutdown.clone()).await;
    // The API server may also stop on a bind error; take the helpers down with it.
    shutdown.cancel();

    if let Err(err) = sweeper.await {
        warn!(%err, "sweeper task ended abnormally");
    }
    if let Some(handle) = observability {
        if let Err(err) = handle.await {
            warn!(%err, "observability task ended abnormally");
        }
    }

    info!("guard stopped");
    result
}

/// Periodically drops history buffers of users that went quiet.
fn spawn_sweeper(cfg: &Config, guard: Arc<Guard>, shutdown: CancellationToken) -> JoinHandle<()> {
    let every = cfg.action_log.sweep_interval();
    let max_idle = cfg.action_log.idle_retention();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let pruned = guard.prune_idle(max_idle);
                    debug!(pruned, "action log sweep finished");
                }
            }
        }
    })
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        _ = interrupt => info!("Received SIGINT, initiating graceful shutdown"),
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}
