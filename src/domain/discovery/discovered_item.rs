use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub type VariablesMap = BTreeMap<String, Value>;
pub type MetricAnnotationsMap = VariablesMap;

/// Instruction for the agent on how to name the entity of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    pub action: String,
    #[serde(rename = "match")]
    pub match_: String,
    pub replace_field: String,
}

impl Replacement {
    pub fn new(action: &str, match_: &str, replace_field: &str) -> Self {
        Self {
            action: action.to_string(),
            match_: match_.to_string(),
            replace_field: replace_field.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredItem {
    pub variables: VariablesMap,
    pub metric_annotations: MetricAnnotationsMap,
    pub entity_rewrites: Vec<Replacement>,
}
