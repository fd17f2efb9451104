/**
 * GPUWATCH KERNEL - aggregator entry point
 *
 * ROLE : loads the node list, seeds the registry, starts the poller and
 * serves the HTTP facade. A bad or missing config stops startup; once running,
 * node failures only ever show up as `offline` records.
 */

mod config;
mod health;
mod http;
mod models;
mod poller;
mod registry;

use crate::config::{load_config, KernelArgs};
use crate::health::PollerHealth;
use crate::http::AppState;
use crate::poller::Poller;
use crate::registry::NodeRegistry;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gpuwatch_kernel=info")),
        )
        .init();

    let args = KernelArgs::parse();
    let cfg = load_config(&args.config)
        .await
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if cfg.nodes.is_empty() {
        warn!("no nodes configured in {}", args.config.display());
    }
    info!("loaded {} nodes from {}", cfg.nodes.len(), args.config.display());

    let registry = NodeRegistry::new(&cfg.nodes);
    let health = PollerHealth::new();

    let poller = Poller::new(
        registry.clone(),
        cfg.nodes.clone(),
        cfg.poller_settings(),
        health.clone(),
    )
    .context("Failed to build HTTP client")?;
    poller.spawn();

    let app = http::build_router(AppState { registry, health });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port(args.port)));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
