/**
 * NODE REGISTRY - per-host status store of the aggregator
 *
 * ROLE : holds one HostStatus per configured host, in config order.
 * The poller is the only writer (whole-record replace), HTTP handlers read.
 *
 * LOCKING : a single parking_lot RwLock, held only for the copy in or out.
 * Readers always get owned clones, so serializing a response never races the
 * next poll and no lock is ever held across network I/O.
 */

use crate::models::{HostConfig, HostStatus, Liveness};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Node not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Default)]
struct Nodes {
    /// Config order, used for listings
    order: Vec<String>,
    records: HashMap<String, HostStatus>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessCounts {
    pub online: usize,
    pub offline: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    inner: Arc<RwLock<Nodes>>,
}

impl NodeRegistry {
    /// Seeds one `unknown` record per host. The key set is fixed from here on.
    pub fn new(hosts: &[HostConfig]) -> Self {
        let mut nodes = Nodes::default();
        for host in hosts {
            if nodes.records.contains_key(&host.name) {
                tracing::warn!("duplicate node {} ignored", host.name);
                continue;
            }
            nodes.order.push(host.name.clone());
            nodes
                .records
                .insert(host.name.clone(), HostStatus::unknown(host.clone()));
        }

        Self {
            inner: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Replaces the whole record of a configured host.
    pub fn upsert_status(&self, name: &str, status: HostStatus) -> Result<(), RegistryError> {
        let mut nodes = self.inner.write();
        match nodes.records.get_mut(name) {
            Some(slot) => {
                *slot = status;
                Ok(())
            }
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    /// Snapshot of every record, in config order
    pub fn get_all(&self) -> Vec<HostStatus> {
        let nodes = self.inner.read();
        nodes
            .order
            .iter()
            .filter_map(|name| nodes.records.get(name).cloned())
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<HostStatus, RegistryError> {
        self.inner
            .read()
            .records
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn liveness_counts(&self) -> LivenessCounts {
        let nodes = self.inner.read();
        let mut counts = LivenessCounts::default();
        for record in nodes.records.values() {
            match record.status() {
                Liveness::Online => counts.online += 1,
                Liveness::Offline => counts.offline += 1,
                Liveness::Unknown => counts.unknown += 1,
            }
        }
        counts
    }
}
