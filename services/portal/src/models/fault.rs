//! Fault reports as stored in the FaultLog sheet

use chrono::{DateTime, TimeZone};
use common::{Cell, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Name of the sheet holding fault reports
pub const FAULT_LOG_SHEET: &str = "FaultLog";

/// FaultLog column titles
pub mod columns {
    pub const TIMESTAMP: &str = "Timestamp (Reported)";
    pub const UNIT_NUMBER: &str = "Unit Number";
    pub const REPORTED_BY: &str = "Reported By";
    pub const REPORTER_EMAIL: &str = "Reporter Email";
    pub const PROBLEM_DESCRIPTION: &str = "Problem Description";
    pub const ZONE: &str = "Zone";
    pub const UNIT_PRIMARY_NAME: &str = "Unit Primary Name";
    pub const UNIT_PRIMARY_EMAIL: &str = "Unit Primary Email";
    pub const UNIT_PRIMARY_PHONE: &str = "Unit Primary Phone";
    pub const INTERNAL_ID: &str = "Internal ID";
    pub const STATUS: &str = "Status";
    pub const PRIORITY: &str = "Priority";
    pub const COMMENTS: &str = "Comments";
    pub const CATEGORY: &str = "Category";
    pub const SUB_CATEGORY: &str = "Sub-Category";
    pub const ASSIGNED_TO: &str = "Assigned To";
    pub const COMPLETION_DATE: &str = "Completion Date";
    pub const LAST_UPDATED: &str = "Last Updated";
    pub const REPORTER_PHONE: &str = "Reporter Phone";
    pub const ACTIVITY_LOG: &str = "ActivityLog";
    pub const LAST_ACTION_BY: &str = "LastActionBy";
    pub const LAST_ACTION_TIME: &str = "LastActionTime";

    /// Header row of a freshly created FaultLog
    pub const ALL: [&str; 22] = [
        TIMESTAMP,
        UNIT_NUMBER,
        REPORTED_BY,
        REPORTER_EMAIL,
        PROBLEM_DESCRIPTION,
        ZONE,
        UNIT_PRIMARY_NAME,
        UNIT_PRIMARY_EMAIL,
        UNIT_PRIMARY_PHONE,
        INTERNAL_ID,
        STATUS,
        PRIORITY,
        COMMENTS,
        CATEGORY,
        SUB_CATEGORY,
        ASSIGNED_TO,
        COMPLETION_DATE,
        LAST_UPDATED,
        REPORTER_PHONE,
        ACTIVITY_LOG,
        LAST_ACTION_BY,
        LAST_ACTION_TIME,
    ];
}

/// Lifecycle state of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Reported,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "On Hold")]
    OnHold,
    Completed,
    Cancelled,
}

impl Status {
    /// Display order used when sorting dropdown values
    pub const ORDER: [Status; 5] = [
        Status::Reported,
        Status::InProgress,
        Status::OnHold,
        Status::Completed,
        Status::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Reported => "Reported",
            Status::InProgress => "In Progress",
            Status::OnHold => "On Hold",
            Status::Completed => "Completed",
            Status::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|s| s.as_str() == value.trim())
    }
}

/// Urgency of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ORDER: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|p| p.as_str() == value.trim())
    }
}

/// One problem report.
///
/// Also the shape of the `problemData` parameter accepted by the email
/// endpoints, so every field defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultRecord {
    pub timestamp: String,
    pub unit_number: String,
    pub reported_by: String,
    pub reporter_email: String,
    pub problem_description: String,
    pub zone: String,
    pub unit_primary_name: String,
    pub unit_primary_email: String,
    pub unit_primary_phone: String,
    pub internal_id: String,
    pub problem_status: String,
    pub problem_priority: String,
    pub comments: String,
    pub category: String,
    pub sub_category: String,
    pub assigned_to: String,
    pub completion_date: String,
    pub last_updated: String,
    pub reporter_phone: String,
    pub activity_log: String,
    pub last_action_by: String,
    pub last_action_time: String,
    #[serde(skip_deserializing)]
    pub activity_log_parsed: Vec<Value>,
}

/// Cell text for a titled column, empty when the column is missing
pub fn column_text(row: &[Cell], columns: &HashMap<String, usize>, title: &str) -> String {
    columns
        .get(title)
        .and_then(|idx| row.get(*idx))
        .map(Cell::text)
        .unwrap_or_default()
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Scalar as text: numbers and booleans are written out, null is empty
fn loose_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl FaultRecord {
    /// Decode client-sent problem data. Fields may arrive as numbers or
    /// booleans where text is stored, e.g. `"unitNumber": 12`.
    pub fn from_problem_data(data: Value) -> serde_json::Result<Self> {
        let data = match data {
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(loose_text(value))))
                    .collect(),
            ),
            other => other,
        };
        serde_json::from_value(data)
    }

    /// Read a FaultLog row through the sheet's header map
    pub fn from_row(row: &[Cell], columns: &HashMap<String, usize>) -> Self {
        use self::columns as c;
        let text = |title: &str| column_text(row, columns, title);

        let activity_log = or_default(text(c::ACTIVITY_LOG), "[]");
        let activity_log_parsed = parse_activity_log(&activity_log);

        Self {
            timestamp: text(c::TIMESTAMP),
            unit_number: text(c::UNIT_NUMBER),
            reported_by: text(c::REPORTED_BY),
            reporter_email: text(c::REPORTER_EMAIL),
            problem_description: text(c::PROBLEM_DESCRIPTION),
            zone: text(c::ZONE),
            unit_primary_name: text(c::UNIT_PRIMARY_NAME),
            unit_primary_email: text(c::UNIT_PRIMARY_EMAIL),
            unit_primary_phone: text(c::UNIT_PRIMARY_PHONE),
            internal_id: text(c::INTERNAL_ID),
            problem_status: or_default(text(c::STATUS), Status::Reported.as_str()),
            problem_priority: or_default(text(c::PRIORITY), Priority::Medium.as_str()),
            comments: text(c::COMMENTS),
            category: text(c::CATEGORY),
            sub_category: text(c::SUB_CATEGORY),
            assigned_to: text(c::ASSIGNED_TO),
            completion_date: text(c::COMPLETION_DATE),
            last_updated: text(c::LAST_UPDATED),
            reporter_phone: text(c::REPORTER_PHONE),
            activity_log,
            last_action_by: text(c::LAST_ACTION_BY),
            last_action_time: text(c::LAST_ACTION_TIME),
            activity_log_parsed,
        }
    }

    /// Lay the record out in the column order of `header`.
    ///
    /// Columns with titles this record does not know stay empty.
    pub fn to_row(&self, header: &[Cell]) -> Row {
        use self::columns as c;
        header
            .iter()
            .map(|title| {
                let value = match title.trimmed().as_str() {
                    c::TIMESTAMP => &self.timestamp,
                    c::UNIT_NUMBER => &self.unit_number,
                    c::REPORTED_BY => &self.reported_by,
                    c::REPORTER_EMAIL => &self.reporter_email,
                    c::PROBLEM_DESCRIPTION => &self.problem_description,
                    c::ZONE => &self.zone,
                    c::UNIT_PRIMARY_NAME => &self.unit_primary_name,
                    c::UNIT_PRIMARY_EMAIL => &self.unit_primary_email,
                    c::UNIT_PRIMARY_PHONE => &self.unit_primary_phone,
                    c::INTERNAL_ID => &self.internal_id,
                    c::STATUS => &self.problem_status,
                    c::PRIORITY => &self.problem_priority,
                    c::COMMENTS => &self.comments,
                    c::CATEGORY => &self.category,
                    c::SUB_CATEGORY => &self.sub_category,
                    c::ASSIGNED_TO => &self.assigned_to,
                    c::COMPLETION_DATE => &self.completion_date,
                    c::LAST_UPDATED => &self.last_updated,
                    c::REPORTER_PHONE => &self.reporter_phone,
                    c::ACTIVITY_LOG => &self.activity_log,
                    c::LAST_ACTION_BY => &self.last_action_by,
                    c::LAST_ACTION_TIME => &self.last_action_time,
                    _ => return Cell::Empty,
                };
                Cell::from(value)
            })
            .collect()
    }

    pub fn status(&self) -> Option<Status> {
        Status::parse(&self.problem_status)
    }

    pub fn priority(&self) -> Option<Priority> {
        Priority::parse(&self.problem_priority)
    }

    pub fn friendly_pid(&self) -> String {
        friendly_pid(&self.internal_id)
    }
}

/// Parse a stored activity log, treating anything but a JSON array as empty
pub fn parse_activity_log(raw: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        _ => Vec::new(),
    }
}

/// Human-friendly problem id: `20250612-143015` becomes `PID 143015`
pub fn friendly_pid(internal_id: &str) -> String {
    if internal_id.is_empty() {
        return "PID Unknown".to_string();
    }
    let parts: Vec<&str> = internal_id.split('-').collect();
    if parts.len() == 2 {
        format!("PID {}", parts[1])
    } else {
        format!("PID {}", internal_id)
    }
}

/// Timestamp-based internal id, `YYYYMMDD-HHMMSS`
pub fn internal_id<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d-%H%M%S").to_string()
}
