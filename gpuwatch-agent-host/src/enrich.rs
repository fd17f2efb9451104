//! Process enrichment for GPU telemetry
//!
//! Optional post-processing of each device's process list:
//! - rank by GPU memory held, heaviest first (stable, ties keep report order)
//! - keep only the top N
//! - attach the owning user name, `unknown` when it cannot be resolved

use gpuwatch_core::{GpuTelemetry, ProcessTelemetry};
use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind, Users};
use tracing::debug;

/// Owner reported when a PID cannot be mapped to a user
pub const UNKNOWN_OWNER: &str = "unknown";

/// Resolves process owners. Implementations must not block indefinitely and
/// must not fail: PIDs they cannot resolve are simply left out of the map.
pub trait OwnerLookup: Send + Sync + 'static {
    fn owners(&self, pids: &[u32]) -> HashMap<u32, String>;
}

/// Owner lookup backed by a fresh sysinfo snapshot of the process table and
/// the user database, taken on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoOwnerLookup;

impl OwnerLookup for SysinfoOwnerLookup {
    fn owners(&self, pids: &[u32]) -> HashMap<u32, String> {
        if pids.is_empty() {
            return HashMap::new();
        }

        let mut sys = System::new();
        sys.refresh_processes_specifics(ProcessRefreshKind::new().with_user(UpdateKind::OnlyIfNotSet));
        let users = Users::new_with_refreshed_list();

        let resolved: HashMap<u32, String> = pids
            .iter()
            .filter_map(|&pid| {
                let uid = sys.process(Pid::from_u32(pid))?.user_id()?;
                let user = users.get_user_by_id(uid)?;
                Some((pid, user.name().to_string()))
            })
            .collect();

        debug!("resolved owners for {}/{} processes", resolved.len(), pids.len());
        resolved
    }
}

/// Sorts by memory used, descending, and keeps the first `limit` entries.
pub fn rank_by_memory(processes: &mut Vec<ProcessTelemetry>, limit: usize) {
    // sort_by is stable: equal usage keeps nvidia-smi's order
    processes.sort_by(|a, b| b.used.cmp(&a.used));
    processes.truncate(limit);
}

/// Ranks every device's processes and returns the PIDs that survived.
pub fn rank_all(gpus: &mut [GpuTelemetry], limit: usize) -> Vec<u32> {
    let mut pids = Vec::new();
    for gpu in gpus.iter_mut() {
        rank_by_memory(&mut gpu.processes, limit);
        pids.extend(gpu.processes.iter().map(|p| p.pid));
    }
    pids
}

pub fn apply_owners(gpus: &mut [GpuTelemetry], owners: &HashMap<u32, String>) {
    for process in gpus.iter_mut().flat_map(|g| g.processes.iter_mut()) {
        let owner = owners
            .get(&process.pid)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
        process.owner = Some(owner);
    }
}
