//! Telemetry collection for GPUWatch agents
//!
//! One call to [`Collector::get_telemetry`]:
//! - runs `nvidia-smi -q -x` (or the configured replacement) as a subprocess
//! - parses and normalizes its XML
//! - optionally ranks processes and resolves their owners
//! - stamps the snapshot with this host's name and the current time
//!
//! Failures are reported, never retried: the aggregator polls again next tick.

use crate::discovery;
use crate::enrich::{self, OwnerLookup};
use crate::smi::{self, SmiParseError};
use gpuwatch_core::HostTelemetry;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, instrument, warn};

/// Longest stderr excerpt carried in an error message
const STDERR_EXCERPT: usize = 256;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("failed to run {program}: {source}")]
    ToolInvocation {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolExited {
        program: String,
        status: String,
        stderr: String,
    },
    #[error(transparent)]
    Parse(#[from] SmiParseError),
}

/// Diagnostic tool invocation
#[derive(Debug, Clone)]
pub struct SmiCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SmiCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-q".to_string(), "-x".to_string()],
        }
    }
}

impl Default for SmiCommand {
    fn default() -> Self {
        Self::new("nvidia-smi")
    }
}

pub struct Collector {
    command: SmiCommand,
    /// Keep only the N heaviest processes per GPU, with owners; `None` disables
    top_processes: Option<usize>,
    owners: Arc<dyn OwnerLookup>,
}

impl Collector {
    pub fn new(command: SmiCommand) -> Self {
        Self {
            command,
            top_processes: None,
            owners: Arc::new(enrich::SysinfoOwnerLookup),
        }
    }

    pub fn with_process_ranking(mut self, top_n: usize) -> Self {
        self.top_processes = Some(top_n);
        self
    }

    #[cfg(test)]
    pub fn with_owner_lookup(mut self, owners: Arc<dyn OwnerLookup>) -> Self {
        self.owners = owners;
        self
    }

    #[instrument(skip(self), fields(program = %self.command.program))]
    pub async fn get_telemetry(&self) -> Result<HostTelemetry, CollectorError> {
        let started = Instant::now();
        let xml = self.run_tool().await?;
        let mut gpus = smi::parse_smi_xml(&xml)?;

        if let Some(top_n) = self.top_processes {
            let pids = enrich::rank_all(&mut gpus, top_n);
            let owners = self.owners.clone();
            let resolved = match tokio::task::spawn_blocking(move || owners.owners(&pids)).await {
                Ok(map) => map,
                Err(e) => {
                    warn!("owner lookup task failed: {}", e);
                    Default::default()
                }
            };
            enrich::apply_owners(&mut gpus, &resolved);
        }

        debug!(
            "collected {} GPU(s) in {}ms",
            gpus.len(),
            started.elapsed().as_millis()
        );
        Ok(HostTelemetry::new(discovery::node_name(), gpus))
    }

    async fn run_tool(&self) -> Result<String, CollectorError> {
        let output = AsyncCommand::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CollectorError::ToolInvocation {
                program: self.command.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            // nvidia-smi prints its failure reason on stdout
            let reason = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.to_string()
            };
            return Err(CollectorError::ToolExited {
                program: self.command.program.clone(),
                status: output.status.to_string(),
                stderr: reason.chars().take(STDERR_EXCERPT).collect(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpuwatch_devkit::fixtures;
    use std::collections::HashMap;

    struct FixedOwners(HashMap<u32, String>);

    impl OwnerLookup for FixedOwners {
        fn owners(&self, pids: &[u32]) -> HashMap<u32, String> {
            pids.iter()
                .filter_map(|pid| self.0.get(pid).map(|o| (*pid, o.clone())))
                .collect()
        }
    }

    /// `cat <fixture>` stands in for nvidia-smi
    fn fixture_command(dir: &tempfile::TempDir, xml: &str) -> SmiCommand {
        let path = dir.path().join("smi.xml");
        std::fs::write(&path, xml).unwrap();
        SmiCommand {
            program: "cat".to_string(),
            args: vec![path.to_string_lossy().to_string()],
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_from_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Collector::new(fixture_command(&dir, fixtures::SMI_TWO_GPUS));

        let snapshot = collector.get_telemetry().await.unwrap();
        assert_eq!(snapshot.node_name, discovery::node_name());
        assert_eq!(snapshot.gpus.len(), 2);
        // no enrichment: full list, report order, no owners
        assert_eq!(snapshot.gpus[0].processes.len(), 3);
        assert!(snapshot.gpus[0].processes.iter().all(|p| p.owner.is_none()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_enrichment_ranks_truncates_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let owners = FixedOwners(HashMap::from([(4102, "alice".to_string())]));
        let collector = Collector::new(fixture_command(&dir, fixtures::SMI_TWO_GPUS))
            .with_process_ranking(2)
            .with_owner_lookup(Arc::new(owners));

        let snapshot = collector.get_telemetry().await.unwrap();
        let procs = &snapshot.gpus[0].processes;
        let pids: Vec<u32> = procs.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![4102, 4103]);
        assert_eq!(procs[0].owner.as_deref(), Some("alice"));
        assert_eq!(procs[1].owner.as_deref(), Some(enrich::UNKNOWN_OWNER));
    }

    #[tokio::test]
    async fn test_missing_tool_is_invocation_error() {
        let collector = Collector::new(SmiCommand::new("/nonexistent/gpuwatch/nvidia-smi"));
        let err = collector.get_telemetry().await.unwrap_err();
        assert!(matches!(err, CollectorError::ToolInvocation { .. }));
        assert!(err.to_string().contains("/nonexistent/gpuwatch/nvidia-smi"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let collector = Collector::new(SmiCommand {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo 'NVIDIA-SMI has failed because it could not communicate with the NVIDIA driver.'; exit 9".to_string(),
            ],
        });

        let err = collector.get_telemetry().await.unwrap_err();
        match err {
            CollectorError::ToolExited { stderr, .. } => {
                assert!(stderr.contains("could not communicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_garbage_output_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Collector::new(fixture_command(&dir, fixtures::SMI_TRUNCATED));
        let err = collector.get_telemetry().await.unwrap_err();
        assert!(matches!(err, CollectorError::Parse(_)));
    }
}
