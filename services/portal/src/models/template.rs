//! Email templates held in the EmailTemplateRange named range

use common::{Cell, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EMAIL_TEMPLATE_RANGE: &str = "EmailTemplateRange";

/// Header row of the template range
pub const TEMPLATE_HEADER: [&str; 6] = [
    "TemplateID",
    "Category",
    "Subject",
    "Body",
    "Variables",
    "FieldAlert",
];

/// A stored email template
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub template_id: String,
    pub category: String,
    pub subject: String,
    pub body: String,
    /// Comma-separated placeholder names
    pub variables: String,
    pub field_alert: bool,
}

impl EmailTemplate {
    pub fn from_row(row: &[Cell]) -> Self {
        let text = |idx: usize| row.get(idx).map(Cell::text).unwrap_or_default();
        Self {
            template_id: text(0),
            category: text(1),
            subject: text(2),
            body: text(3),
            variables: text(4),
            field_alert: row.get(5).and_then(Cell::as_bool).unwrap_or(false),
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            Cell::from(&self.template_id),
            Cell::from(&self.category),
            Cell::from(&self.subject),
            Cell::from(&self.body),
            Cell::from(&self.variables),
            Cell::Bool(self.field_alert),
        ]
    }

    /// Names listed in `variables`, trimmed, blanks dropped
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// The `templateData` parameter of the create and update actions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateInput {
    pub template_id: String,
    pub category: String,
    pub subject: String,
    pub body: String,
    pub variables: String,
    /// Absent means "leave unchanged" on update
    pub field_alert: Option<Value>,
}

impl TemplateInput {
    pub fn is_complete(&self) -> bool {
        [&self.template_id, &self.category, &self.subject, &self.body]
            .iter()
            .all(|v| !v.is_empty())
    }

    /// Flag value when one was supplied
    pub fn field_alert(&self) -> Option<bool> {
        self.field_alert.as_ref().map(|value| match value {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        })
    }

    pub fn into_template(self, field_alert: bool) -> EmailTemplate {
        EmailTemplate {
            template_id: self.template_id,
            category: self.category,
            subject: self.subject,
            body: self.body,
            variables: self.variables,
            field_alert,
        }
    }
}
