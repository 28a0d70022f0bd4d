//! Email delivery log kept in the EmailLog sheet

use common::{Cell, Workbook};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PortalResult;

pub const EMAIL_LOG_SHEET: &str = "EmailLog";

const HEADER: [&str; 7] = [
    "Timestamp",
    "EmailType",
    "Subject",
    "Recipients",
    "Status",
    "TemplateID",
    "AdminUser",
];

pub const STATUS_SUCCESS: &str = "Success";
pub const STATUS_FAILED: &str = "Failed";

/// One delivery to be recorded
#[derive(Debug, Clone, Default)]
pub struct LogEntry {
    pub email_type: String,
    pub subject: String,
    pub recipients: usize,
    pub status: String,
    pub template_id: String,
    pub admin_user: String,
}

impl LogEntry {
    pub fn success(email_type: &str, subject: impl Into<String>, recipients: usize) -> Self {
        Self {
            email_type: email_type.to_string(),
            subject: subject.into(),
            recipients,
            status: STATUS_SUCCESS.to_string(),
            ..Default::default()
        }
    }

    /// Failed delivery; the error text takes the TemplateID column
    pub fn failed(email_type: &str, error: impl Into<String>) -> Self {
        Self {
            email_type: email_type.to_string(),
            subject: STATUS_FAILED.to_string(),
            status: STATUS_FAILED.to_string(),
            template_id: error.into(),
            ..Default::default()
        }
    }

    pub fn template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    pub fn admin(mut self, admin_user: impl Into<String>) -> Self {
        self.admin_user = admin_user.into();
        self
    }
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// A logged delivery as read back
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: String,
    pub email_type: String,
    pub subject: String,
    pub recipients: Value,
    pub status: String,
    pub template_id: String,
    pub admin_user: String,
}

impl LogRecord {
    fn from_row(row: &[Cell]) -> Self {
        let text = |idx: usize| row.get(idx).map(Cell::text).unwrap_or_default();
        let recipients = match row.get(3) {
            Some(Cell::Number(n)) if n.fract() == 0.0 => Value::from(*n as i64),
            Some(Cell::Number(n)) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Some(cell) => Value::String(cell.text()),
            None => Value::Null,
        };
        Self {
            timestamp: text(0),
            email_type: text(1),
            subject: text(2),
            recipients,
            status: text(4),
            template_id: text(5),
            admin_user: text(6),
        }
    }

    /// Emails this row counts for: the recipient count when numeric, else 1
    pub fn weight(&self) -> u64 {
        match &self.recipients {
            Value::Number(n) => n.as_f64().map(|n| n.max(0.0) as u64).unwrap_or(1),
            _ => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Email log repository
#[derive(Clone)]
pub struct EmailLogRepository {
    workbook: Workbook,
}

impl EmailLogRepository {
    pub fn new(workbook: Workbook) -> Self {
        Self { workbook }
    }

    /// Append one entry. Failures are logged and swallowed so that a
    /// broken log never fails a delivery.
    pub async fn record(&self, timestamp: &str, entry: &LogEntry) {
        if let Err(e) = self.try_record(timestamp, entry).await {
            warn!("Failed to log email activity: {}", e);
        }
    }

    async fn try_record(&self, timestamp: &str, entry: &LogEntry) -> PortalResult<()> {
        let mut table = self.workbook.sheet_or_create(EMAIL_LOG_SHEET, &HEADER).await?;
        table.push_row(vec![
            Cell::from(timestamp),
            Cell::from(or_default(&entry.email_type, "Unknown")),
            Cell::from(or_default(&entry.subject, "No Subject")),
            Cell::Number(entry.recipients as f64),
            Cell::from(or_default(&entry.status, "Unknown")),
            Cell::from(&entry.template_id),
            Cell::from(or_default(&entry.admin_user, "System")),
        ]);
        self.workbook.save(&table).await?;

        debug!("Email activity logged: {} {}", entry.email_type, entry.status);
        Ok(())
    }

    /// All logged rows, oldest first; empty when the sheet does not exist
    pub async fn records(&self) -> PortalResult<Vec<LogRecord>> {
        let Some(table) = self.workbook.sheet(EMAIL_LOG_SHEET).await? else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows()
            .iter()
            .skip(1)
            .map(|row| LogRecord::from_row(row))
            .collect())
    }
}
