use crate::gateway::ApiCallPayload;
use crate::shared::ReportId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    QueryIntake = 1,
    FieldCollection = 2,
    Submitted = 3,
}

impl WorkflowStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (WorkflowStep::QueryIntake, WorkflowStep::FieldCollection)
                | (WorkflowStep::FieldCollection, WorkflowStep::Submitted)
        )
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStep::QueryIntake => write!(f, "query_intake"),
            WorkflowStep::FieldCollection => write!(f, "field_collection"),
            WorkflowStep::Submitted => write!(f, "submitted"),
        }
    }
}

/// In-memory state of one workflow instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub step: WorkflowStep,
    pub analysis_query: String,
    pub api_calls: Vec<String>,
    pub requested_data: Vec<Vec<String>>,
    pub form_fields: Vec<String>,
    pub user_inputs: BTreeMap<String, String>,
    pub report_id: Option<ReportId>,
}

impl WorkflowState {
    /// Form fields that still lack a non-blank value, in form order.
    pub fn missing_fields(&self) -> Vec<String> {
        self.form_fields
            .iter()
            .filter(|field| {
                self.user_inputs
                    .get(field.as_str())
                    .map(|value| value.trim().is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    pub fn api_call_payloads(&self) -> Vec<ApiCallPayload> {
        build_api_call_payloads(&self.api_calls, &self.requested_data, &self.user_inputs)
    }
}

/// Deduplicated union of all requested field names, first occurrence wins.
pub fn derive_form_fields(requested_data: &[Vec<String>]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for field in requested_data.iter().flatten() {
        if seen.insert(field.as_str()) {
            fields.push(field.clone());
        }
    }
    fields
}

/// One payload per endpoint, carrying only the fields that endpoint asked
/// for. Blank values are left out.
pub fn build_api_call_payloads(
    api_calls: &[String],
    requested_data: &[Vec<String>],
    user_inputs: &BTreeMap<String, String>,
) -> Vec<ApiCallPayload> {
    api_calls
        .iter()
        .enumerate()
        .map(|(idx, endpoint)| {
            let fields = requested_data
                .get(idx)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|name| {
                            user_inputs
                                .get(name)
                                .filter(|value| !value.trim().is_empty())
                                .map(|value| (name.clone(), value.clone()))
                        })
                        .collect()
                })
                .unwrap_or_default();
            ApiCallPayload {
                endpoint: endpoint.clone(),
                fields,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn form_fields_keep_first_seen_order() {
        let requested = vec![strings(&["ssn", "name"]), strings(&["name", "income", "ssn"])];
        assert_eq!(
            derive_form_fields(&requested),
            strings(&["ssn", "name", "income"])
        );
        assert!(derive_form_fields(&[]).is_empty());
    }

    #[test]
    fn payloads_intersect_inputs_with_each_endpoint() {
        let api_calls = strings(&["bureauA", "bureauB"]);
        let requested = vec![strings(&["ssn", "name"]), strings(&["name", "income"])];
        let inputs = BTreeMap::from([
            ("ssn".to_string(), "123".to_string()),
            ("name".to_string(), "Ann".to_string()),
            ("income".to_string(), String::new()),
        ]);

        let payloads = build_api_call_payloads(&api_calls, &requested, &inputs);
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].endpoint, "bureauA");
        assert_eq!(payloads[0].fields.len(), 2);
        assert_eq!(payloads[1].fields.get("name").map(String::as_str), Some("Ann"));
        assert!(!payloads[1].fields.contains_key("income"));
    }

    #[test]
    fn missing_fields_treats_blank_values_as_missing() {
        let state = WorkflowState {
            form_fields: strings(&["ssn", "name", "income"]),
            user_inputs: BTreeMap::from([
                ("ssn".to_string(), "123".to_string()),
                ("name".to_string(), "   ".to_string()),
            ]),
            ..WorkflowState::default()
        };
        assert_eq!(state.missing_fields(), strings(&["name", "income"]));
    }

    #[test]
    fn steps_only_move_forward_one_at_a_time() {
        assert!(WorkflowStep::QueryIntake.can_advance_to(WorkflowStep::FieldCollection));
        assert!(!WorkflowStep::QueryIntake.can_advance_to(WorkflowStep::Submitted));
        assert!(!WorkflowStep::Submitted.can_advance_to(WorkflowStep::QueryIntake));
        assert_eq!(WorkflowStep::Submitted.number(), 3);
    }
}
