//! GPUWatch Agent Host - per-machine GPU telemetry collector
//!
//! Runs next to the GPUs and answers the aggregator's polls:
//! - `nvidia-smi -q -x` on every request, parsed and unit-normalized
//! - optional top-N process ranking with owner lookup
//! - JSON over HTTP on `/gpu-info`, liveness on `/health`

mod collector;
mod config;
mod discovery;
mod enrich;
mod http;
mod smi;

use anyhow::{Context, Result};
use clap::Parser;
use collector::{Collector, SmiCommand};
use config::AgentConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gpuwatch_agent_host=info")),
        )
        .init();

    let config = AgentConfig::parse();
    info!("GPUWatch agent starting on {} (node {})", config.listen_addr(), discovery::node_name());

    let mut collector = Collector::new(SmiCommand::new(&config.smi_path));
    if let Some(top_n) = config.top_processes {
        info!("process ranking enabled, top {} per GPU", top_n);
        collector = collector.with_process_ranking(top_n);
    }

    let app = http::build_router(Arc::new(collector));
    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;

    axum::serve(listener, app)
        .await
        .context("GPU info server failed")?;

    Ok(())
}
