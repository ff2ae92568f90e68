//! Workflow process engine core.
//!
//! Compiles a declarative BPMN-style element graph into an ordered step
//! projection and runs it as a live process instance: creation, task
//! completion and advancement, explicit status overrides, querying, and
//! teardown, with an append-only history per instance.
//!
//! The engine is pure in-memory state machinery. Parsing, HTTP, auth, and
//! durable storage live outside; the boundary types ([`ElementDto`],
//! [`InstanceSnapshot`], [`SnapshotStore`], [`EventSink`]) define the
//! contract with those collaborators.

pub mod compiler;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod types;

pub use compiler::{compile, map_element_type, SUPPORTED_TYPES};
pub use engine::ProcessEngine;
pub use error::EngineError;
pub use events::{EngineEvent, EventSink, NullSink, TracingSink};
pub use graph::{Element, ElementDto, ElementGraph, ElementType, GraphWarning};
pub use reconcile::PersistedStatus;
pub use registry::InstanceRegistry;
pub use store::{InstanceSnapshot, MemorySnapshotStore, SnapshotStore};
pub use types::{
    InstanceStatus, Priority, ProcessDefinition, ProcessHistoryEntry, ProcessInstance,
    ProcessStep, StartContext, StepStatus, StepType, Variables,
};
