use crate::error::EngineError;
use crate::types::ProcessInstance;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// One registry slot. The write lock serializes mutations for a single
/// instance id; readers clone the current `Arc` snapshot and never observe
/// a partially applied update.
struct InstanceCell {
    snapshot: RwLock<Arc<ProcessInstance>>,
}

/// Concurrency-safe owner of all live process instances.
///
/// Mutations against the same id are strictly serialized; mutations against
/// different ids proceed independently (no global lock). Every accessor
/// returns an immutable snapshot — a live instance is never handed out for
/// external mutation.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: DashMap<String, Arc<InstanceCell>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
        }
    }

    /// Register an instance under its id, replacing any previous instance
    /// with the same deterministic id. Returns the stored snapshot.
    pub fn create(&self, instance: ProcessInstance) -> Arc<ProcessInstance> {
        let snapshot = Arc::new(instance);
        self.instances.insert(
            snapshot.id.clone(),
            Arc::new(InstanceCell {
                snapshot: RwLock::new(Arc::clone(&snapshot)),
            }),
        );
        snapshot
    }

    /// Current snapshot for `id`, if registered.
    pub fn get(&self, id: &str) -> Option<Arc<ProcessInstance>> {
        let cell = Arc::clone(self.instances.get(id)?.value());
        let snapshot = Arc::clone(&cell.snapshot.read());
        Some(snapshot)
    }

    /// Apply `f` to the instance under its write lock.
    ///
    /// `f` works on a private clone; the new snapshot is swapped in only if
    /// `f` succeeds, so a failed mutation leaves the instance exactly as it
    /// was (all-or-nothing).
    pub fn mutate<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut ProcessInstance) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let cell = self
            .instances
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::NotFound(id.to_owned()))?;

        let mut guard = cell.snapshot.write();
        let mut next = ProcessInstance::clone(&guard);
        let out = f(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Remove `id`. Returns whether anything was removed; removing an
    /// unknown id is not an error.
    pub fn remove(&self, id: &str) -> bool {
        self.instances.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Ids of all registered instances, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.instances
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Element, ElementType};
    use crate::types::{InstanceStatus, Variables};
    use chrono::Utc;

    fn make_instance(id: &str) -> ProcessInstance {
        let start = Element {
            id: "s1".into(),
            element_type: ElementType::StartEvent,
            name: "s1".into(),
            outgoing: Vec::new(),
        };
        let now = Utc::now();
        ProcessInstance {
            id: id.into(),
            process_id: id.trim_start_matches("PROC_").into(),
            status: InstanceStatus::Active,
            current_element: start.clone(),
            elements: vec![start],
            steps: Vec::new(),
            variables: Variables::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn create_get_remove() {
        let registry = InstanceRegistry::new();
        registry.create(make_instance("PROC_a"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("PROC_a").is_some());
        assert!(registry.get("PROC_b").is_none());
        assert!(registry.remove("PROC_a"));
        assert!(!registry.remove("PROC_a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn create_replaces_same_id() {
        let registry = InstanceRegistry::new();
        registry.create(make_instance("PROC_a"));
        let mut second = make_instance("PROC_a");
        second.status = InstanceStatus::Suspended;
        registry.create(second);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("PROC_a").unwrap().status,
            InstanceStatus::Suspended
        );
    }

    #[test]
    fn mutate_swaps_a_new_snapshot() {
        let registry = InstanceRegistry::new();
        registry.create(make_instance("PROC_a"));
        let before = registry.get("PROC_a").unwrap();

        registry
            .mutate("PROC_a", |inst| {
                inst.status = InstanceStatus::Inactive;
                Ok(())
            })
            .unwrap();

        // the old snapshot is untouched; the registry serves the new one
        assert_eq!(before.status, InstanceStatus::Active);
        assert_eq!(
            registry.get("PROC_a").unwrap().status,
            InstanceStatus::Inactive
        );
    }

    #[test]
    fn failed_mutate_leaves_snapshot_untouched() {
        let registry = InstanceRegistry::new();
        registry.create(make_instance("PROC_a"));

        let err = registry.mutate("PROC_a", |inst| {
            inst.status = InstanceStatus::Failed;
            Err::<(), _>(EngineError::InvalidState("boom".into()))
        });
        assert!(err.is_err());
        assert_eq!(
            registry.get("PROC_a").unwrap().status,
            InstanceStatus::Active
        );
    }

    #[test]
    fn mutate_missing_id_is_not_found() {
        let registry = InstanceRegistry::new();
        let err = registry.mutate("PROC_x", |_| Ok(())).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn concurrent_mutations_on_one_id_are_serialized() {
        let registry = Arc::new(InstanceRegistry::new());
        registry.create(make_instance("PROC_a"));

        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry
                    .mutate("PROC_a", |inst| {
                        inst.variables
                            .insert(format!("k{i}"), serde_json::json!(i));
                        Ok(())
                    })
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // read-modify-write under the per-id lock loses no update
        assert_eq!(registry.get("PROC_a").unwrap().variables.len(), 32);
    }
}
