use crate::error::EngineError;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ─── Raw element (parser boundary) ────────────────────────────

/// One element as handed over by the upstream BPMN parser.
///
/// Every field is loose JSON on purpose: the parser boundary delivers
/// whatever was stored, and a non-string `id` or a non-array `outgoing` must
/// be *representable* here so the compiler can apply its fail-closed rule
/// instead of blowing up during deserialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementDto {
    #[serde(default)]
    pub id: Value,
    #[serde(default, rename = "type")]
    pub element_type: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub outgoing: Value,
    #[serde(default, rename = "assignedTo")]
    pub assigned_to: Value,
    #[serde(default, rename = "dueDate")]
    pub due_date: Value,
    #[serde(default)]
    pub data: Value,
}

impl ElementDto {
    /// Well-formed element with the three structural fields set.
    pub fn new(id: &str, element_type: &str, outgoing: &[&str]) -> Self {
        Self {
            id: Value::String(id.to_owned()),
            element_type: Value::String(element_type.to_owned()),
            outgoing: Value::Array(
                outgoing
                    .iter()
                    .map(|s| Value::String((*s).to_owned()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Value::String(name.to_owned());
        self
    }

    /// Non-empty string id, or None if the field is malformed.
    pub fn id_str(&self) -> Option<&str> {
        self.id.as_str().filter(|s| !s.is_empty())
    }

    pub fn type_str(&self) -> Option<&str> {
        self.element_type.as_str()
    }

    pub fn name_str(&self) -> Option<&str> {
        self.name.as_str()
    }

    /// Outgoing ids if the field is a well-formed array of strings.
    /// A missing field counts as an empty list; anything else is malformed.
    pub fn outgoing_ids(&self) -> Option<Vec<String>> {
        match &self.outgoing {
            Value::Null => Some(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => None,
        }
    }

    /// Structurally sound: string id, string type, array-of-strings outgoing.
    pub fn is_well_formed(&self) -> bool {
        self.id_str().is_some() && self.type_str().is_some() && self.outgoing_ids().is_some()
    }
}

// ─── Typed element ────────────────────────────────────────────

/// Element kinds the engine knows about. `Unknown` covers anything a newer
/// modeler emits; unknown elements are carried in the graph but never
/// compiled into steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    StartEvent,
    EndEvent,
    UserTask,
    ServiceTask,
    ApprovalTask,
    ScriptTask,
    BusinessRuleTask,
    Gateway,
    #[serde(other)]
    Unknown,
}

impl ElementType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "startEvent" => ElementType::StartEvent,
            "endEvent" => ElementType::EndEvent,
            "userTask" => ElementType::UserTask,
            "serviceTask" => ElementType::ServiceTask,
            "approvalTask" => ElementType::ApprovalTask,
            "scriptTask" => ElementType::ScriptTask,
            "businessRuleTask" => ElementType::BusinessRuleTask,
            "gateway" => ElementType::Gateway,
            _ => ElementType::Unknown,
        }
    }

    /// True for the element kinds the step compiler turns into steps.
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            ElementType::UserTask
                | ElementType::ServiceTask
                | ElementType::ApprovalTask
                | ElementType::ScriptTask
                | ElementType::BusinessRuleTask
        )
    }
}

/// A validated node in the process definition graph. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub name: String,
    pub outgoing: Vec<String>,
}

// ─── Graph construction warnings ──────────────────────────────

/// Soft findings from graph construction. None of these abort the build;
/// the caller decides whether to surface them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphWarning {
    /// Element at `index` in the input array had a malformed structural field.
    Malformed { index: usize },
    /// `outgoing` entry pointed at an id that does not exist in the graph.
    DanglingOutgoing { element_id: String, target: String },
}

impl std::fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphWarning::Malformed { index } => {
                write!(f, "element at index {index} is malformed")
            }
            GraphWarning::DanglingOutgoing { element_id, target } => {
                write!(f, "element {element_id}: outgoing '{target}' does not exist")
            }
        }
    }
}

// ─── Element graph ────────────────────────────────────────────

/// The validated element graph: typed nodes plus directed successor edges.
/// Pure data — lookup and traversal only, no execution behavior.
#[derive(Clone, Debug)]
pub struct ElementGraph {
    elements: Vec<Element>,
    graph: DiGraph<usize, ()>,
    index: HashMap<String, NodeIndex>,
}

impl ElementGraph {
    /// Build a graph from raw parser output.
    ///
    /// Duplicate ids are a hard failure. Malformed elements are skipped and
    /// dangling `outgoing` entries are dropped, each with a warning the
    /// caller can forward to its observability sink.
    pub fn build(dtos: &[ElementDto]) -> Result<(Self, Vec<GraphWarning>), EngineError> {
        let mut warnings = Vec::new();
        let mut elements: Vec<Element> = Vec::with_capacity(dtos.len());

        for (i, dto) in dtos.iter().enumerate() {
            let (Some(id), Some(ty), Some(outgoing)) =
                (dto.id_str(), dto.type_str(), dto.outgoing_ids())
            else {
                warnings.push(GraphWarning::Malformed { index: i });
                continue;
            };
            if elements.iter().any(|e| e.id == id) {
                return Err(EngineError::Definition(format!(
                    "duplicate element id: {id}"
                )));
            }
            elements.push(Element {
                id: id.to_owned(),
                element_type: ElementType::parse(ty),
                name: dto.name_str().unwrap_or(id).to_owned(),
                outgoing,
            });
        }

        // Drop dangling successor references before wiring edges.
        let ids: Vec<String> = elements.iter().map(|e| e.id.clone()).collect();
        for element in &mut elements {
            element.outgoing.retain(|target| {
                let exists = ids.iter().any(|id| id == target);
                if !exists {
                    warnings.push(GraphWarning::DanglingOutgoing {
                        element_id: element.id.clone(),
                        target: target.clone(),
                    });
                }
                exists
            });
        }

        let mut graph = DiGraph::new();
        let mut index = HashMap::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let node = graph.add_node(i);
            index.insert(element.id.clone(), node);
        }
        for element in &elements {
            let from = index[&element.id];
            for target in &element.outgoing {
                graph.add_edge(from, index[target], ());
            }
        }

        Ok((
            Self {
                elements,
                graph,
                index,
            },
            warnings,
        ))
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        let node = self.index.get(id)?;
        Some(&self.elements[self.graph[*node]])
    }

    /// Direct successors of `id`, in edge insertion order.
    pub fn successors(&self, id: &str) -> Vec<&Element> {
        let Some(node) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&Element> = self
            .graph
            .neighbors(*node)
            .map(|n| &self.elements[self.graph[n]])
            .collect();
        // petgraph iterates neighbors in reverse insertion order
        out.reverse();
        out
    }

    /// First element of type `startEvent`, if any.
    pub fn start_event(&self) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| e.element_type == ElementType::StartEvent)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
