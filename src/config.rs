use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::storage::SurrealStorage;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Embedding dimensionality; vectors of any other length are rejected at
    /// ingestion.
    pub dimension: usize,
    /// Louvain resolution; higher values bias toward more, smaller
    /// communities.
    pub resolution: f32,
    /// Detection aborts (with an error, never a partial persist) past this
    /// many candidate edges.
    pub max_edges: usize,
    /// Wall-clock budget for one detection run.
    pub detection_budget_ms: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("skillgraph-mcp"),
            dimension: 1024,
            resolution: 1.0,
            max_edges: 50_000,
            detection_budget_ms: 30_000,
            log_level: "info".to_string(),
        }
    }
}

/// Per-tenant single-flight guard for community detection. Read paths are
/// stateless and never take this; detection is the only write path, and two
/// runs for the same tenant would race on the replace-all transaction.
#[derive(Default)]
pub struct DetectionLocks {
    running: Mutex<HashSet<String>>,
}

impl DetectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the tenant, or return None if a run is already in flight.
    /// The claim is released when the guard drops.
    pub fn try_acquire(&self, tenant_id: &str) -> Option<DetectionGuard<'_>> {
        let mut running = self.running.lock().expect("detection lock poisoned");
        if running.insert(tenant_id.to_string()) {
            Some(DetectionGuard {
                locks: self,
                tenant_id: tenant_id.to_string(),
            })
        } else {
            None
        }
    }
}

pub struct DetectionGuard<'a> {
    locks: &'a DetectionLocks,
    tenant_id: String,
}

impl Drop for DetectionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.locks.running.lock() {
            running.remove(&self.tenant_id);
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub storage: Arc<SurrealStorage>,
    pub detection_locks: DetectionLocks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_locks_single_flight() {
        let locks = DetectionLocks::new();

        let guard = locks.try_acquire("t1");
        assert!(guard.is_some());
        assert!(locks.try_acquire("t1").is_none());
        // other tenants never contend
        assert!(locks.try_acquire("t2").is_some());

        drop(guard);
        assert!(locks.try_acquire("t1").is_some());
    }
}
