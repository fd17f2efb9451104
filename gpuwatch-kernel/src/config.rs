use crate::models::HostConfig;
use crate::poller::PollerSettings;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Command line of the aggregator. Every flag can also come from the
/// environment (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[command(name = "gpuwatch-kernel", about = "GPUWatch aggregator: polls GPU agents and serves their status")]
pub struct KernelArgs {
    /// Node list and aggregator settings, YAML or JSON
    #[arg(long, env = "GPUWATCH_KERNEL_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Overrides `aggregator.port` from the config file
    #[arg(long, env = "GPUWATCH_KERNEL_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("node #{0} has an empty name")]
    EmptyNodeName(usize),
    #[error("node {0} is listed more than once")]
    DuplicateNode(String),
    #[error("node {0} has port 0")]
    InvalidNodePort(String),
}

/// Aggregator config file. JSON or YAML, both go through serde_yaml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub nodes: Vec<HostConfig>,
    #[serde(default)]
    pub aggregator: AggregatorSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatorSection {
    /// 0 or missing means DEFAULT_PORT
    #[serde(default)]
    pub port: u16,
    /// 0 or missing means 5s
    #[serde(default)]
    pub poll_interval_secs: u64,
    /// 0 or missing means 5s
    #[serde(default)]
    pub fetch_timeout_secs: u64,
}

impl AggregatorConfig {
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let config: AggregatorConfig = if text.trim().is_empty() {
            AggregatorConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.name.trim().is_empty() {
                return Err(ConfigError::EmptyNodeName(i));
            }
            if node.port == 0 {
                return Err(ConfigError::InvalidNodePort(node.name.clone()));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(ConfigError::DuplicateNode(node.name.clone()));
            }
        }
        Ok(())
    }

    /// CLI override first, then the file, then DEFAULT_PORT
    pub fn listen_port(&self, cli_override: Option<u16>) -> u16 {
        match (cli_override, self.aggregator.port) {
            (Some(port), _) => port,
            (None, 0) => DEFAULT_PORT,
            (None, port) => port,
        }
    }

    pub fn poller_settings(&self) -> PollerSettings {
        let secs = |v: u64, default: u64| Duration::from_secs(if v == 0 { default } else { v });
        PollerSettings {
            interval: secs(self.aggregator.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS),
            fetch_timeout: secs(self.aggregator.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

pub async fn load_config(path: impl AsRef<Path>) -> Result<AggregatorConfig, ConfigError> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    AggregatorConfig::from_text(&txt)
}
