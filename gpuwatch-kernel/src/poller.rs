/**
 * POLLER - periodic fan-out of /gpu-info fetches
 *
 * Each tick spawns one task per configured node, waits for every one of them
 * (success, failure or timeout), records the tick in PollerHealth, and only
 * then sleeps for the interval. Ticks never overlap, so at most one fetch per
 * node is in flight from the loop at any time.
 *
 * Failures are not retried; the node is simply marked offline and tried again
 * on the next tick.
 */

use crate::health::PollerHealth;
use crate::models::{HostConfig, HostStatus, Liveness};
use crate::registry::NodeRegistry;
use gpuwatch_core::HostTelemetry;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

/// Why a node could not be read. The Display text is what ends up in the
/// node's `error` field.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to connect: {0}")]
    Transport(String),
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub online: usize,
    pub offline: usize,
    /// Poll tasks that panicked or were cancelled
    pub lost: usize,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct Poller {
    registry: NodeRegistry,
    nodes: Arc<[HostConfig]>,
    client: reqwest::Client,
    settings: PollerSettings,
    health: PollerHealth,
}

impl Poller {
    pub fn new(
        registry: NodeRegistry,
        nodes: Vec<HostConfig>,
        settings: PollerSettings,
        health: PollerHealth,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.fetch_timeout)
            .build()?;

        Ok(Self {
            registry,
            nodes: nodes.into(),
            client,
            settings,
            health,
        })
    }

    pub async fn fetch_node(&self, node: &HostConfig) -> Result<HostTelemetry, FetchError> {
        let resp = self
            .client
            .get(node.gpu_info_url())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.settings.fetch_timeout)
        } else {
            FetchError::Transport(error_chain(&err))
        }
    }

    /// Fetches one node and replaces its registry record with the outcome.
    #[instrument(skip(self, node), fields(node = %node.name))]
    pub async fn poll_node(&self, node: &HostConfig) -> Liveness {
        let previous = self.registry.get(&node.name).ok().map(|s| s.status());

        let (record, liveness) = match self.fetch_node(node).await {
            Ok(data) => {
                if previous != Some(Liveness::Online) {
                    info!("node online ({} gpus)", data.gpus.len());
                }
                (HostStatus::online(node.clone(), data), Liveness::Online)
            }
            Err(e) => {
                if previous == Some(Liveness::Offline) {
                    debug!("still offline: {}", e);
                } else {
                    warn!("node offline: {}", e);
                }
                (HostStatus::offline(node.clone(), e.to_string()), Liveness::Offline)
            }
        };

        if let Err(e) = self.registry.upsert_status(&node.name, record) {
            warn!("dropping poll result: {}", e);
        }
        liveness
    }

    /// One full tick. Returns only once every node's fetch has resolved.
    pub async fn run_tick(&self) -> TickSummary {
        let started = Instant::now();
        let mut tasks = JoinSet::new();
        for node in self.nodes.iter().cloned() {
            let poller = self.clone();
            tasks.spawn(async move { poller.poll_node(&node).await });
        }

        let mut summary = TickSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Liveness::Online) => summary.online += 1,
                Ok(_) => summary.offline += 1,
                Err(e) => {
                    warn!("poll task lost: {}", e);
                    summary.lost += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        self.health.record_tick(summary.elapsed);
        summary
    }

    /// Runs ticks forever. The interval starts counting once a tick completes.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "poller started: {} nodes, every {:?}, fetch timeout {:?}",
                self.nodes.len(),
                self.settings.interval,
                self.settings.fetch_timeout
            );
            loop {
                let summary = self.run_tick().await;
                debug!(
                    "tick done in {:?}: {} online, {} offline",
                    summary.elapsed, summary.online, summary.offline
                );
                tokio::time::sleep(self.settings.interval).await;
            }
        })
    }
}

/// reqwest's top-level message rarely says what went wrong, the sources do
fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
