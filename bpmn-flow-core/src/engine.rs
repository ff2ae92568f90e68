use crate::compiler::{self, compile};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventSink, TracingSink};
use crate::graph::ElementGraph;
use crate::registry::InstanceRegistry;
use crate::store::InstanceSnapshot;
use crate::types::{
    InstanceStatus, ProcessDefinition, ProcessHistoryEntry, ProcessInstance, StartContext,
    StepStatus, Variables, ACTION_TASK_COMPLETED,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// What a single `execute_task` call did to the instance.
enum TaskOutcome {
    /// The step was already completed — nothing changed.
    Duplicate,
    /// Advanced to the next ready element.
    Advanced(String),
    /// Every compiled step is done; the instance completed.
    Completed,
    /// Steps remain but none is ready (dependency chain broken through a
    /// filtered element). The instance stays where it is.
    Stalled,
}

/// The workflow engine: compiles definitions into instances and drives
/// their state machine as callers complete work items.
///
/// All operations are non-blocking in-memory transitions; per-instance
/// serialization and snapshot atomicity come from the registry.
pub struct ProcessEngine {
    registry: InstanceRegistry,
    events: Arc<dyn EventSink>,
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEngine {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(events: Arc<dyn EventSink>) -> Self {
        Self {
            registry: InstanceRegistry::new(),
            events,
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Start a new instance of `definition`.
    ///
    /// Requires exactly one reachable `startEvent`; rejects definitions the
    /// step compiler fails closed on. The instance id is deterministic
    /// (`PROC_{process_id}`), so restarting the same process replaces its
    /// previous live instance.
    pub fn start_process(
        &self,
        definition: &ProcessDefinition,
        ctx: StartContext,
    ) -> Result<Arc<ProcessInstance>, EngineError> {
        let (graph, warnings) = ElementGraph::build(&definition.elements)?;
        if !warnings.is_empty() {
            self.emit(EngineEvent::GraphWarnings {
                process_id: ctx.process_id.clone(),
                warnings,
            });
        }

        let start = graph
            .start_event()
            .ok_or_else(|| {
                EngineError::Definition(format!("process {}: no start event", definition.id))
            })?
            .clone();

        let steps = compile(&definition.elements);
        let supported = definition
            .elements
            .iter()
            .filter(|e| compiler::is_supported_type(e.type_str()))
            .count();
        if steps.is_empty() && supported > 0 {
            return Err(EngineError::Definition(format!(
                "process {}: step compilation rejected malformed elements",
                definition.id
            )));
        }

        let now = Utc::now();
        let instance = ProcessInstance {
            id: ProcessInstance::instance_id_for(&ctx.process_id),
            process_id: ctx.process_id.clone(),
            status: InstanceStatus::Active,
            current_element: start,
            elements: graph.elements().to_vec(),
            steps,
            variables: ctx.variables.unwrap_or_default(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let snapshot = self.registry.create(instance);
        self.emit(EngineEvent::InstanceStarted {
            instance_id: snapshot.id.clone(),
            process_id: ctx.process_id,
        });
        Ok(snapshot)
    }

    /// Record completion of `step_id` and advance the instance.
    ///
    /// `data` is shallow-merged into the instance variables (later keys
    /// win) and recorded on the history entry. Completing an
    /// already-completed step is accepted as a no-op: no duplicate history
    /// entry, no re-advancement, no variable merge.
    ///
    /// A `step_id` that matches no compiled step is rejected with
    /// `Validation` before anything is merged or appended — the history
    /// only ever names steps that exist. Checks run duplicate, then
    /// terminal, then existence, so a redelivered completion short-circuits
    /// first.
    pub fn execute_task(
        &self,
        instance_id: &str,
        step_id: &str,
        data: Variables,
    ) -> Result<(), EngineError> {
        let outcome = self.registry.mutate(instance_id, |inst| {
            // duplicate before terminal: re-delivering the completion that
            // finished the instance must stay a no-op, not an error
            if inst.is_step_completed(step_id) {
                return Ok(TaskOutcome::Duplicate);
            }
            if inst.status.is_terminal() {
                return Err(EngineError::InvalidState(format!(
                    "instance {instance_id} is {} and accepts no further tasks",
                    inst.status
                )));
            }
            if inst.step(step_id).is_none() {
                return Err(EngineError::Validation(format!(
                    "instance {instance_id} has no step {step_id}"
                )));
            }

            let now = Utc::now();
            let user_id = data
                .get("completedBy")
                .and_then(|v| v.as_str())
                .unwrap_or("system")
                .to_owned();

            for (key, value) in &data {
                inst.variables.insert(key.clone(), value.clone());
            }
            inst.history.push(ProcessHistoryEntry {
                entry_id: Uuid::now_v7(),
                step_id: step_id.to_owned(),
                action: ACTION_TASK_COMPLETED.to_owned(),
                timestamp: now,
                user_id,
                data,
            });
            if let Some(step) = inst.steps.iter_mut().find(|s| s.element_id == step_id) {
                step.status = StepStatus::Completed;
            }
            inst.updated_at = now;

            match next_ready_step(inst) {
                Some(element_id) => {
                    if let Some(element) = inst.elements.iter().find(|e| e.id == element_id) {
                        inst.current_element = element.clone();
                    }
                    Ok(TaskOutcome::Advanced(element_id))
                }
                None => {
                    if inst.steps.iter().all(|s| s.status != StepStatus::Pending) {
                        inst.status = InstanceStatus::Completed;
                        inst.completed_at = Some(now);
                        Ok(TaskOutcome::Completed)
                    } else {
                        Ok(TaskOutcome::Stalled)
                    }
                }
            }
        })?;

        match outcome {
            TaskOutcome::Duplicate => {}
            TaskOutcome::Advanced(element_id) => {
                self.emit(EngineEvent::TaskExecuted {
                    instance_id: instance_id.to_owned(),
                    step_id: step_id.to_owned(),
                });
                self.emit(EngineEvent::InstanceAdvanced {
                    instance_id: instance_id.to_owned(),
                    element_id,
                });
            }
            TaskOutcome::Completed => {
                self.emit(EngineEvent::TaskExecuted {
                    instance_id: instance_id.to_owned(),
                    step_id: step_id.to_owned(),
                });
                self.emit(EngineEvent::InstanceCompleted {
                    instance_id: instance_id.to_owned(),
                });
            }
            TaskOutcome::Stalled => {
                self.emit(EngineEvent::TaskExecuted {
                    instance_id: instance_id.to_owned(),
                    step_id: step_id.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Read-only snapshot of the instance. A miss is reported to the sink
    /// at warn level before the error propagates.
    pub fn instance_status(
        &self,
        instance_id: &str,
    ) -> Result<Arc<ProcessInstance>, EngineError> {
        match self.registry.get(instance_id) {
            Some(snapshot) => Ok(snapshot),
            None => {
                self.emit(EngineEvent::MissingInstance {
                    instance_id: instance_id.to_owned(),
                });
                Err(EngineError::NotFound(instance_id.to_owned()))
            }
        }
    }

    /// Explicit status override for pause/resume/archive flows originating
    /// outside task completion. Validates `status` against the engine
    /// vocabulary; entering a terminal status stamps `completed_at`.
    /// Re-entering a terminal status keeps the first stamp — `completed_at`
    /// records when the instance originally finished, not the last override.
    pub fn update_instance_status(
        &self,
        instance_id: &str,
        status: &str,
    ) -> Result<(), EngineError> {
        let status: InstanceStatus = status.parse()?;
        self.registry.mutate(instance_id, |inst| {
            inst.status = status;
            inst.updated_at = Utc::now();
            if status.is_terminal() && inst.completed_at.is_none() {
                inst.completed_at = Some(inst.updated_at);
            }
            Ok(())
        })?;
        self.emit(EngineEvent::StatusUpdated {
            instance_id: instance_id.to_owned(),
            status,
        });
        Ok(())
    }

    /// Remove the instance from the registry. Stopping an unknown id is a
    /// no-op success — the caller is expected to have persisted the final
    /// snapshot beforehand.
    pub fn stop_instance(&self, instance_id: &str) {
        if self.registry.remove(instance_id) {
            self.emit(EngineEvent::InstanceStopped {
                instance_id: instance_id.to_owned(),
            });
        }
    }

    /// Build the persistence payload for `save_instance_state`: the status
    /// translated to the persisted vocabulary plus the full history.
    pub fn snapshot(&self, instance_id: &str) -> Result<InstanceSnapshot, EngineError> {
        let instance = self
            .registry
            .get(instance_id)
            .ok_or_else(|| EngineError::NotFound(instance_id.to_owned()))?;
        Ok(InstanceSnapshot {
            instance_id: instance.id.clone(),
            process_id: instance.process_id.clone(),
            status: instance.status.to_persisted(),
            history: instance.history.clone(),
            taken_at: Utc::now(),
        })
    }

    fn emit(&self, event: EngineEvent) {
        // Emission failures never abort a state transition.
        let _ = self.events.emit(&event);
    }
}

/// Lowest-sequence pending step whose predecessors are all completed.
///
/// `depends_on` stores each step's *successor* edges, so a step's
/// prerequisites are the steps that list it. A step no other step points at
/// is ready immediately. Returns the element id to advance to.
fn next_ready_step(inst: &ProcessInstance) -> Option<String> {
    inst.steps
        .iter()
        .filter(|step| step.status == StepStatus::Pending)
        .filter(|step| {
            inst.steps
                .iter()
                .filter(|other| other.depends_on.iter().any(|d| d == &step.element_id))
                .all(|predecessor| predecessor.status == StepStatus::Completed)
        })
        .min_by_key(|step| step.sequence)
        .map(|step| step.element_id.clone())
}
