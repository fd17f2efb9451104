//! Collector configuration
//!
//! Every setting is a CLI flag with an environment fallback, so the agent
//! can run from a systemd unit without a config file.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Parser)]
#[command(name = "gpuwatch-agent-host", version, about = "Serves this host's GPU telemetry over HTTP")]
pub struct AgentConfig {
    /// Port for /gpu-info and /health
    #[arg(long, env = "GPUWATCH_AGENT_PORT", default_value_t = 8081,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "GPUWATCH_AGENT_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// nvidia-smi executable
    #[arg(long, env = "GPUWATCH_SMI_PATH", default_value = "nvidia-smi")]
    pub smi_path: String,

    /// Report only the N processes holding the most GPU memory, with their owners
    #[arg(long, env = "GPUWATCH_TOP_PROCESSES",
          value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub top_processes: Option<usize>,
}

impl AgentConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
