use crate::graph::ElementDto;
use crate::types::{Priority, ProcessStep, StepStatus, StepType, Variables};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Element types the compiler turns into executable steps. Events and
/// gateways are excluded from the step projection entirely.
pub const SUPPORTED_TYPES: [&str; 5] = [
    "userTask",
    "serviceTask",
    "approvalTask",
    "scriptTask",
    "businessRuleTask",
];

pub fn is_supported_type(raw: Option<&str>) -> bool {
    raw.is_some_and(|t| SUPPORTED_TYPES.contains(&t))
}

/// Fixed element-type → step-type table. Total: anything unrecognized
/// (including a missing type) falls back to `task`.
pub fn map_element_type(raw: Option<&str>) -> StepType {
    match raw {
        Some("userTask") => StepType::Task,
        Some("serviceTask") => StepType::Notification,
        Some("approvalTask") => StepType::Approval,
        Some("scriptTask") => StepType::Automation,
        Some("businessRuleTask") => StepType::Decision,
        _ => StepType::Task,
    }
}

/// Compile a raw element array into the ordered step projection.
///
/// Fail-closed: if any element with a supported type is malformed (missing
/// or non-string id, non-array `outgoing`), the whole compilation yields an
/// empty list rather than a partial workflow. Output order equals input
/// order of surviving elements, and `sequence` numbers are 1-based over
/// that order — downstream display and advancement rely on both.
///
/// `depends_on` is the element's `outgoing` list intersected with the
/// surviving id set; successors that were filtered out or never existed are
/// dropped silently (documented contract — a dependency chain routed
/// through an unsupported element stays broken).
pub fn compile(elements: &[ElementDto]) -> Vec<ProcessStep> {
    let supported: Vec<&ElementDto> = elements
        .iter()
        .filter(|e| is_supported_type(e.type_str()))
        .collect();

    let mut survivors = Vec::with_capacity(supported.len());
    for dto in &supported {
        let (Some(id), Some(outgoing)) = (dto.id_str(), dto.outgoing_ids()) else {
            continue;
        };
        survivors.push((id.to_owned(), outgoing, *dto));
    }
    if survivors.len() != supported.len() {
        return Vec::new();
    }

    let surviving_ids: HashSet<&str> = survivors.iter().map(|(id, _, _)| id.as_str()).collect();

    survivors
        .iter()
        .enumerate()
        .map(|(i, (id, outgoing, dto))| ProcessStep {
            element_id: id.clone(),
            name: dto.name_str().unwrap_or(id).to_owned(),
            step_type: map_element_type(dto.type_str()),
            status: StepStatus::Pending,
            priority: Priority::Medium,
            sequence: (i + 1) as u32,
            depends_on: outgoing
                .iter()
                .filter(|target| surviving_ids.contains(target.as_str()))
                .cloned()
                .collect(),
            assigned_to: dto.assigned_to.as_str().map(str::to_owned),
            due_date: dto
                .due_date
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc)),
            data: dto
                .data
                .as_object()
                .cloned()
                .unwrap_or_else(Variables::new),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ElementDto;
    use serde_json::json;

    #[test]
    fn compiles_supported_elements_in_input_order() {
        let elements = vec![
            ElementDto::new("t1", "userTask", &["t2"]),
            ElementDto::new("t2", "serviceTask", &[]),
        ];
        let steps = compile(&elements);
        assert_eq!(steps.len(), 2);

        assert_eq!(steps[0].element_id, "t1");
        assert_eq!(steps[0].step_type, StepType::Task);
        assert_eq!(steps[0].sequence, 1);
        assert_eq!(steps[0].depends_on, vec!["t2".to_string()]);

        assert_eq!(steps[1].element_id, "t2");
        assert_eq!(steps[1].step_type, StepType::Notification);
        assert_eq!(steps[1].sequence, 2);
        assert!(steps[1].depends_on.is_empty());
    }

    #[test]
    fn events_and_gateways_are_filtered_out() {
        let elements = vec![
            ElementDto::new("s1", "startEvent", &["t1"]),
            ElementDto::new("t1", "userTask", &["g1"]),
            ElementDto::new("g1", "gateway", &["e1"]),
            ElementDto::new("e1", "endEvent", &[]),
        ];
        let steps = compile(&elements);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].element_id, "t1");
        // successor through the gateway is dropped, not bridged
        assert!(steps[0].depends_on.is_empty());
    }

    #[test]
    fn compilation_is_deterministic() {
        let elements = vec![
            ElementDto::new("a", "approvalTask", &["b", "c"]),
            ElementDto::new("b", "scriptTask", &[]),
            ElementDto::new("c", "businessRuleTask", &["a"]),
        ];
        let first = compile(&elements);
        let second = compile(&elements);
        assert_eq!(first, second);
        assert_eq!(first[0].step_type, StepType::Approval);
        assert_eq!(first[1].step_type, StepType::Automation);
        assert_eq!(first[2].step_type, StepType::Decision);
    }

    #[test]
    fn malformed_supported_element_fails_the_whole_compilation() {
        let mut bad = ElementDto::new("t2", "serviceTask", &[]);
        bad.id = json!(42);
        let elements = vec![ElementDto::new("t1", "userTask", &[]), bad];
        assert!(compile(&elements).is_empty());
    }

    #[test]
    fn non_array_outgoing_fails_closed() {
        let mut bad = ElementDto::new("t1", "userTask", &[]);
        bad.outgoing = json!({"to": "t2"});
        assert!(compile(&[bad]).is_empty());
    }

    #[test]
    fn missing_outgoing_counts_as_empty() {
        let mut dto = ElementDto::new("t1", "userTask", &[]);
        dto.outgoing = json!(null);
        let steps = compile(&[dto]);
        assert_eq!(steps.len(), 1);
        assert!(steps[0].depends_on.is_empty());
    }

    #[test]
    fn malformed_unsupported_element_does_not_poison_compilation() {
        // no id at all, but startEvent is not in the allowlist
        let bad_event = ElementDto {
            element_type: json!("startEvent"),
            ..ElementDto::default()
        };
        let elements = vec![bad_event, ElementDto::new("t1", "userTask", &[])];
        assert_eq!(compile(&elements).len(), 1);
    }

    #[test]
    fn dangling_depends_on_is_dropped() {
        let elements = vec![ElementDto::new("t1", "userTask", &["ghost", "t2"])];
        let steps = compile(&elements);
        assert!(steps[0].depends_on.is_empty());
    }

    #[test]
    fn defaults_are_pending_medium() {
        let steps = compile(&[ElementDto::new("t1", "userTask", &[])]);
        assert_eq!(steps[0].status, StepStatus::Pending);
        assert_eq!(steps[0].priority, Priority::Medium);
    }

    #[test]
    fn type_mapping_is_total() {
        assert_eq!(map_element_type(Some("userTask")), StepType::Task);
        assert_eq!(map_element_type(Some("serviceTask")), StepType::Notification);
        assert_eq!(map_element_type(Some("approvalTask")), StepType::Approval);
        assert_eq!(map_element_type(Some("scriptTask")), StepType::Automation);
        assert_eq!(
            map_element_type(Some("businessRuleTask")),
            StepType::Decision
        );
        assert_eq!(map_element_type(Some("somethingElse")), StepType::Task);
        assert_eq!(map_element_type(None), StepType::Task);
    }

    #[test]
    fn optional_step_metadata_is_carried() {
        let mut dto = ElementDto::new("t1", "userTask", &[]).with_name("Review");
        dto.assigned_to = json!("u42");
        dto.due_date = json!("2025-06-01T12:00:00Z");
        dto.data = json!({"formKey": "review-form"});
        let steps = compile(&[dto]);
        assert_eq!(steps[0].name, "Review");
        assert_eq!(steps[0].assigned_to.as_deref(), Some("u42"));
        assert!(steps[0].due_date.is_some());
        assert_eq!(steps[0].data["formKey"], "review-form");
    }

    #[test]
    fn garbage_step_metadata_does_not_fail_closed() {
        let mut dto = ElementDto::new("t1", "userTask", &[]);
        dto.assigned_to = json!(17);
        dto.due_date = json!("not-a-date");
        dto.data = json!("not-an-object");
        let steps = compile(&[dto]);
        assert_eq!(steps.len(), 1);
        assert!(steps[0].assigned_to.is_none());
        assert!(steps[0].due_date.is_none());
        assert!(steps[0].data.is_empty());
    }
}
