use crate::registry::{LivenessCounts, NodeRegistry};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct AggregatorHealth {
    pub uptime_seconds: u64,
    pub ticks_completed: u64,
    pub last_tick_duration_ms: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_tick_at: Option<OffsetDateTime>,
    pub nodes_total: usize,
    pub nodes: LivenessCounts,
}

/// Poller bookkeeping, shared between the poll loop and the HTTP layer
#[derive(Clone)]
pub struct PollerHealth {
    start_time: Instant,
    ticks_completed: Arc<AtomicU64>,
    last_tick_ms: Arc<AtomicU64>,
    last_tick_at: Arc<Mutex<Option<OffsetDateTime>>>,
}

impl PollerHealth {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            ticks_completed: Arc::new(AtomicU64::new(0)),
            last_tick_ms: Arc::new(AtomicU64::new(0)),
            last_tick_at: Arc::new(Mutex::new(None)),
        }
    }

    pub fn record_tick(&self, elapsed: Duration) {
        self.last_tick_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        *self.last_tick_at.lock() = Some(OffsetDateTime::now_utc());
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_completed(&self) -> u64 {
        self.ticks_completed.load(Ordering::Relaxed)
    }

    pub fn get_health(&self, registry: &NodeRegistry) -> AggregatorHealth {
        AggregatorHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            ticks_completed: self.ticks_completed(),
            last_tick_duration_ms: self.last_tick_ms.load(Ordering::Relaxed),
            last_tick_at: *self.last_tick_at.lock(),
            nodes_total: registry.len(),
            nodes: registry.liveness_counts(),
        }
    }
}

impl Default for PollerHealth {
    fn default() -> Self {
        Self::new()
    }
}
