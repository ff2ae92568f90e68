use crate::reconcile::PersistedStatus;
use crate::types::ProcessHistoryEntry;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// The payload the caller persists on `save_instance_state`: status in the
/// persisted vocabulary plus the full audit trail. The engine builds it;
/// it never writes it anywhere itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSnapshot {
    pub instance_id: String,
    pub process_id: String,
    pub status: PersistedStatus,
    pub history: Vec<ProcessHistoryEntry>,
    pub taken_at: DateTime<Utc>,
}

/// Persistence boundary for instance snapshots. The single collaborator
/// that performs I/O; implementations may suspend, the engine core never
/// calls this directly.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save_instance_state(&self, snapshot: &InstanceSnapshot) -> Result<()>;
    async fn load_instance_state(&self, instance_id: &str) -> Result<Option<InstanceSnapshot>>;
}

/// In-memory SnapshotStore for tests and POC wiring.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<HashMap<String, InstanceSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save_instance_state(&self, snapshot: &InstanceSnapshot) -> Result<()> {
        let mut store = self.inner.write().map_err(|e| anyhow!("lock: {e}"))?;
        store.insert(snapshot.instance_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_instance_state(&self, instance_id: &str) -> Result<Option<InstanceSnapshot>> {
        let store = self.inner.read().map_err(|e| anyhow!("lock: {e}"))?;
        Ok(store.get(instance_id).cloned())
    }
}
