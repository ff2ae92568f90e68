use crate::graph::GraphWarning;
use crate::types::InstanceStatus;
use anyhow::Result;

/// Structured events emitted by the engine for the observability layer.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    InstanceStarted {
        instance_id: String,
        process_id: String,
    },
    TaskExecuted {
        instance_id: String,
        step_id: String,
    },
    InstanceAdvanced {
        instance_id: String,
        element_id: String,
    },
    InstanceCompleted {
        instance_id: String,
    },
    StatusUpdated {
        instance_id: String,
        status: InstanceStatus,
    },
    InstanceStopped {
        instance_id: String,
    },
    /// Status query against an id the registry does not hold.
    MissingInstance {
        instance_id: String,
    },
    /// Soft findings from element graph construction.
    GraphWarnings {
        process_id: String,
        warnings: Vec<GraphWarning>,
    },
}

/// Narrow emission capability injected into the engine. A failing sink must
/// never abort an in-flight state transition — the engine drops the error.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent) -> Result<()>;
}

/// Default sink: forwards engine events to `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &EngineEvent) -> Result<()> {
        match event {
            EngineEvent::InstanceStarted {
                instance_id,
                process_id,
            } => {
                tracing::info!(%instance_id, %process_id, "process instance started");
            }
            EngineEvent::TaskExecuted {
                instance_id,
                step_id,
            } => {
                tracing::info!(%instance_id, %step_id, "task completed");
            }
            EngineEvent::InstanceAdvanced {
                instance_id,
                element_id,
            } => {
                tracing::info!(%instance_id, %element_id, "instance advanced");
            }
            EngineEvent::InstanceCompleted { instance_id } => {
                tracing::info!(%instance_id, "instance completed");
            }
            EngineEvent::StatusUpdated {
                instance_id,
                status,
            } => {
                tracing::info!(%instance_id, %status, "instance status updated");
            }
            EngineEvent::InstanceStopped { instance_id } => {
                tracing::info!(%instance_id, "instance stopped");
            }
            EngineEvent::MissingInstance { instance_id } => {
                tracing::warn!(%instance_id, "status query for unknown instance");
            }
            EngineEvent::GraphWarnings {
                process_id,
                warnings,
            } => {
                for warning in warnings {
                    tracing::warn!(%process_id, %warning, "element graph warning");
                }
            }
        }
        Ok(())
    }
}

/// Discards everything. Useful in tests that assert on state, not logs.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &EngineEvent) -> Result<()> {
        Ok(())
    }
}
