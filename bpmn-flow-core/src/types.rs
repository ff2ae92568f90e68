use crate::error::EngineError;
use crate::graph::{Element, ElementDto};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

/// Instance variables and step payloads — flat JSON objects at the boundary.
pub type Variables = Map<String, Value>;

/// History action recorded when a step is completed through `execute_task`.
pub const ACTION_TASK_COMPLETED: &str = "taskCompleted";

// ─── Step projection ──────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Task,
    Approval,
    Notification,
    Automation,
    Decision,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Executable projection of a supported element, produced by the step
/// compiler. `sequence` is 1-based input order; `depends_on` holds the
/// element's successor edges restricted to other compiled steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    pub element_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub status: StepStatus,
    pub priority: Priority,
    pub sequence: u32,
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Variables,
}

// ─── Instance status ──────────────────────────────────────────

/// Engine-level instance status. Distinct from the persisted record's
/// vocabulary — translation goes through the reconciler, never a cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Active,
    Inactive,
    Suspended,
    Completed,
    Failed,
}

impl InstanceStatus {
    /// Terminal statuses forbid further task execution.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceStatus::Completed | InstanceStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Active => "ACTIVE",
            InstanceStatus::Inactive => "INACTIVE",
            InstanceStatus::Suspended => "SUSPENDED",
            InstanceStatus::Completed => "COMPLETED",
            InstanceStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(InstanceStatus::Active),
            "INACTIVE" => Ok(InstanceStatus::Inactive),
            "SUSPENDED" => Ok(InstanceStatus::Suspended),
            "COMPLETED" => Ok(InstanceStatus::Completed),
            "FAILED" => Ok(InstanceStatus::Failed),
            other => Err(EngineError::Validation(format!(
                "unknown instance status: {other}"
            ))),
        }
    }
}

// ─── History ──────────────────────────────────────────────────

/// Append-only audit record of one instance-affecting action.
/// Never mutated or removed after append.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessHistoryEntry {
    pub entry_id: Uuid,
    pub step_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Variables,
}

// ─── Definition and start context ─────────────────────────────

/// An already-parsed process definition, as delivered by the upstream
/// parser/persistence layer. Elements stay in raw form until compiled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: u32,
    pub elements: Vec<ElementDto>,
}

/// Caller-supplied context for starting a process instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartContext {
    pub process_id: String,
    pub user_id: String,
    #[serde(default)]
    pub variables: Option<Variables>,
}

// ─── Process instance ─────────────────────────────────────────

/// One running execution of a process definition. Owned by the instance
/// registry for its lifetime; mutated only through the registry's lock.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub id: String,
    pub process_id: String,
    pub status: InstanceStatus,
    pub current_element: Element,
    pub elements: Vec<Element>,
    pub steps: Vec<ProcessStep>,
    pub variables: Variables,
    pub history: Vec<ProcessHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessInstance {
    /// Deterministic instance id derived from the process id.
    pub fn instance_id_for(process_id: &str) -> String {
        format!("PROC_{process_id}")
    }

    pub fn step(&self, element_id: &str) -> Option<&ProcessStep> {
        self.steps.iter().find(|s| s.element_id == element_id)
    }

    /// True once a `taskCompleted` history entry exists for `step_id`.
    pub fn is_step_completed(&self, step_id: &str) -> bool {
        self.history
            .iter()
            .any(|h| h.action == ACTION_TASK_COMPLETED && h.step_id == step_id)
    }
}
