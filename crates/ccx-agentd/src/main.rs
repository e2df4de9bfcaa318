mod config;
mod dispatcher;
mod error;
mod fixture;
mod shutdown;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ccx_core::{GateConfig, MemoryStore, Reconciler, TransitionPayloads};
use ccx_observe::init_logger;
use ccx_prometheus::PrometheusMetrics;

use crate::{
    config::AgentConfig,
    dispatcher::{Dispatcher, Trigger},
    error::AgentError,
    fixture::Fixture,
};

const TRIGGER_QUEUE: usize = 1024;

/// Concurrency controls agent backed by an in-memory store.
#[derive(Parser)]
#[command(name = "ccx-agentd")]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(long, env = "CCX_CONFIG")]
    config: Option<PathBuf>,

    /// Seed fixture, overriding the one named in the config file
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Comma-separated namespaces to gate, overriding the config file; empty gates all
    #[arg(long, env = "CCX_ALLOWED_NAMESPACES")]
    allowed_namespaces: Option<String>,

    /// Exit once every seeded run has been processed instead of waiting for a signal
    #[arg(long)]
    once: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, cfg: &mut AgentConfig) {
        if let Some(fixture) = &self.fixture {
            cfg.fixture = Some(fixture.clone());
        }
        if let Some(namespaces) = &self.allowed_namespaces {
            cfg.gate = match namespaces.parse::<GateConfig>() {
                Ok(gate) => gate,
                Err(never) => match never {},
            };
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) config + logger
    let mut cfg = AgentConfig::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);
    init_logger(&cfg.logger)?;
    info!(
        allowed_namespaces = ?cfg.gate.allowed_namespaces,
        "logger initialized"
    );

    // 2) store
    let store = Arc::new(MemoryStore::new());
    let pending = match &cfg.fixture {
        Some(path) => Fixture::load(path)?.seed(&store).await,
        None => {
            warn!("no fixture configured, starting with an empty store");
            Vec::new()
        }
    };

    // 3) reconciler
    let metrics = PrometheusMetrics::new().map_err(|e| AgentError::Metrics(e.to_string()))?;
    let payloads = Arc::new(TransitionPayloads::new().map_err(AgentError::from)?);
    let reconciler = Reconciler::new(store.clone(), store.clone(), payloads, cfg.gate.clone())
        .with_metrics(Arc::new(metrics.clone()));

    // 4) dispatcher
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::channel(TRIGGER_QUEUE);
    let dispatcher = Dispatcher::new(reconciler, store.clone(), cfg.retry.clone());
    let worker = tokio::spawn(dispatcher.run(rx, token.clone()));

    let signals = {
        let token = token.clone();
        tokio::spawn(async move {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(()) => {
                    info!("shutdown requested");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "failed to install signal handlers"),
            }
        })
    };

    for run in &pending {
        tx.send(Trigger::for_run(run)).await?;
    }
    info!(triggers = pending.len(), "pending runs queued");

    // Closing the queue lets the dispatcher finish once idle.
    let tx = if cli.once { None } else { Some(tx) };
    let stats = worker.await?;
    drop(tx);
    signals.abort();

    info!(?stats, "dispatcher stopped");
    for run in store.runs().await {
        info!(
            run = %run.key(),
            status = %run.spec_status,
            applied = run.concurrency_applied(),
            "final state"
        );
    }
    match metrics.render() {
        Ok(text) => debug!(metrics = %text, "metrics snapshot"),
        Err(e) => warn!(error = %e, "failed to render metrics"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ccx-agentd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn allowed_namespaces_flag_replaces_config_allowlist() {
        let mut cfg = AgentConfig {
            gate: "dev".parse().unwrap(),
            ..Default::default()
        };

        parse(&["--allowed-namespaces", "ci, release"]).apply(&mut cfg);

        assert!(cfg.gate.allows("ci"));
        assert!(cfg.gate.allows("release"));
        assert!(!cfg.gate.allows("dev"));
    }

    #[test]
    fn empty_allowed_namespaces_gates_every_namespace() {
        let mut cfg = AgentConfig {
            gate: "dev".parse().unwrap(),
            ..Default::default()
        };

        parse(&["--allowed-namespaces", ""]).apply(&mut cfg);

        assert!(cfg.gate.allowed_namespaces.is_empty());
        assert!(cfg.gate.allows("anything"));
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut cfg = AgentConfig {
            gate: "dev".parse().unwrap(),
            ..Default::default()
        };

        parse(&[]).apply(&mut cfg);

        assert!(cfg.gate.allows("dev"));
        assert!(!cfg.gate.allows("ci"));
        assert!(cfg.fixture.is_none());
    }
}
