//! Activity log entries attached to a problem

use serde::{Deserialize, Serialize};

/// How a comment edit relates to the previous text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Addition,
    Replacement,
}

/// One changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub change_type: Option<ChangeType>,
}

impl FieldChange {
    pub fn new(field: &str, old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            change_type: None,
        }
    }

    pub fn with_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = Some(change_type);
        self
    }
}

/// A batch of changes made by one user in one update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub user: String,
    pub action: String,
    pub changes: Vec<FieldChange>,
}
