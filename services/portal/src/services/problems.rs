//! Problem lifecycle: submission, field updates and the activity log

use common::Table;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::envelope::ActionParams;
use crate::error::{PortalError, PortalResult};
use crate::models::activity::{ActivityEntry, FieldChange};
use crate::models::fault::{
    FaultRecord, Priority, Status, columns as c, internal_id, parse_activity_log,
};
use crate::models::resident::{DEFAULT_ZONE, Resident};
use crate::repositories::{FaultRepository, ResidentRepository};
use crate::services::activity::{append_entry, classify_comment_change};
use crate::services::clock::Clock;
use crate::services::notify::Notifier;

/// User recorded when an update names nobody
pub const SYSTEM_USER: &str = "SYSTEM";

/// Requested changes to one problem.
///
/// `None` leaves a field alone. Status and priority are only applied when
/// non-empty; the other fields accept an empty value.
#[derive(Debug, Clone, Default)]
pub struct ProblemUpdate {
    pub internal_id: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub comments: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub assigned_to: Option<String>,
    pub completion_date: Option<String>,
    pub user: String,
}

impl ProblemUpdate {
    pub fn from_params(params: &ActionParams) -> Self {
        let filled = |key: &str| params.get(key).filter(|v| !v.is_empty()).map(str::to_string);
        let sent = |key: &str| params.get(key).map(str::to_string);

        Self {
            internal_id: params.str("internalId").to_string(),
            status: filled("problemStatus"),
            priority: filled("problemPriority"),
            comments: sent("comments"),
            category: sent("category"),
            sub_category: sent("subCategory"),
            assigned_to: sent("assignedTo"),
            completion_date: sent("completionDate"),
            user: filled("user").unwrap_or_else(|| SYSTEM_USER.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub message: String,
    pub updates: Vec<String>,
    pub activity_logged: bool,
    pub changes_count: usize,
}

/// A resident's fault report as submitted from the form
#[derive(Debug, Clone, Default)]
pub struct FaultSubmission {
    pub unit_number: String,
    pub reported_by: String,
    pub problem_description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub message: String,
    pub internal_id: String,
    #[serde(rename = "friendlyPID")]
    pub friendly_pid: String,
}

/// Cell access to one FaultLog row by column title
struct RowEditor<'a> {
    table: &'a mut Table,
    row: usize,
    columns: HashMap<String, usize>,
}

impl RowEditor<'_> {
    /// Current text, `None` when the column does not exist
    fn text(&self, title: &str) -> Option<String> {
        let col = *self.columns.get(title)?;
        Some(self.table.get(self.row, col).text())
    }

    /// Write a value; false when the column does not exist
    fn set(&mut self, title: &str, value: &str) -> bool {
        match self.columns.get(title) {
            Some(&col) => {
                self.table.set(self.row, col, value);
                true
            }
            None => false,
        }
    }

    /// Write `value` when it differs from the stored text, returning the
    /// previous text
    fn change(&mut self, title: &str, value: &str) -> Option<String> {
        let old = self.text(title)?;
        if old == value {
            return None;
        }
        self.set(title, value);
        Some(old)
    }

    fn record(&self) -> FaultRecord {
        FaultRecord::from_row(&self.table.rows()[self.row], &self.columns)
    }
}

/// Problem workflows
#[derive(Clone)]
pub struct ProblemService {
    faults: FaultRepository,
    residents: ResidentRepository,
    notifier: Notifier,
    clock: Clock,
    activity_log_limit: usize,
}

impl ProblemService {
    pub fn new(
        faults: FaultRepository,
        residents: ResidentRepository,
        notifier: Notifier,
        clock: Clock,
        activity_log_limit: usize,
    ) -> Self {
        Self {
            faults,
            residents,
            notifier,
            clock,
            activity_log_limit,
        }
    }

    /// Apply field changes, log them and notify on completion
    pub async fn update(&self, request: &ProblemUpdate) -> PortalResult<UpdateReport> {
        let mut table = self.faults.sheet().await?;
        let row = FaultRepository::find_row(&table, &request.internal_id)
            .ok_or_else(|| PortalError::not_found("Problem not found"))?;
        let columns = table.column_map();
        let mut editor = RowEditor {
            table: &mut table,
            row,
            columns,
        };

        let mut updates = Vec::new();
        let mut changes = Vec::new();

        let completed = Status::Completed.as_str();
        let completing = request.status.as_deref() == Some(completed)
            && editor.text(c::STATUS).unwrap_or_default() != completed;

        if completing {
            let today = self.clock.today();
            let old = editor.text(c::COMPLETION_DATE).unwrap_or_default();
            editor.set(c::COMPLETION_DATE, &today);
            updates.push(format!("Auto-completion date: {}", today));
            changes.push(FieldChange::new(c::COMPLETION_DATE, old, today.as_str()));

            match self.notifier.send_completion(&editor.record()).await {
                Ok(_) => updates.push("📧 Completion notification sent".to_string()),
                Err(e) => {
                    warn!("Completion email for {} failed: {}", request.internal_id, e);
                    updates.push(format!("⚠️ Email notification failed: {}", e));
                }
            }
        }

        let mut apply = |editor: &mut RowEditor<'_>, title: &str, value: Option<&str>| {
            let Some(value) = value else { return };
            if let Some(old) = editor.change(title, value) {
                updates.push(format!("{}: {}", title, value));
                let change = if title == c::COMMENTS {
                    classify_comment_change(&old, value)
                } else {
                    FieldChange::new(title, old, value)
                };
                changes.push(change);
            }
        };

        apply(&mut editor, c::STATUS, request.status.as_deref());
        apply(&mut editor, c::PRIORITY, request.priority.as_deref());
        apply(&mut editor, c::COMMENTS, request.comments.as_deref());
        apply(&mut editor, c::CATEGORY, request.category.as_deref());
        apply(&mut editor, c::SUB_CATEGORY, request.sub_category.as_deref());
        apply(&mut editor, c::ASSIGNED_TO, request.assigned_to.as_deref());
        if !completing {
            apply(&mut editor, c::COMPLETION_DATE, request.completion_date.as_deref());
        }

        let now = self.clock.iso_now();
        if !changes.is_empty() {
            if let Some(raw) = editor.text(c::ACTIVITY_LOG) {
                let entry = ActivityEntry {
                    timestamp: now.clone(),
                    user: request.user.clone(),
                    action: "Updated".to_string(),
                    changes: changes.clone(),
                };
                let log = append_entry(parse_activity_log(&raw), &entry, self.activity_log_limit);
                editor.set(c::ACTIVITY_LOG, &Value::Array(log).to_string());
            }
        }

        editor.set(c::LAST_ACTION_BY, &request.user);
        editor.set(c::LAST_ACTION_TIME, &now);
        if editor.set(c::LAST_UPDATED, &now) {
            updates.push(format!("Last Updated: {}", now));
        }

        self.faults.save(&table).await?;
        info!(
            "Problem {} updated by {} ({} changes)",
            request.internal_id,
            request.user,
            changes.len()
        );

        Ok(UpdateReport {
            message: "Problem updated successfully".to_string(),
            updates,
            activity_logged: !changes.is_empty(),
            changes_count: changes.len(),
        })
    }

    /// Parsed activity log of a problem
    pub async fn activity_log(&self, internal_id: &str) -> PortalResult<Vec<Value>> {
        if internal_id.is_empty() {
            return Err(PortalError::validation("Internal ID required"));
        }
        self.faults
            .find(internal_id)
            .await?
            .map(|problem| problem.activity_log_parsed)
            .ok_or_else(|| PortalError::not_found("Problem not found"))
    }

    /// Directory rows, or none when the directory cannot be read
    async fn directory(&self) -> Vec<Resident> {
        match self.residents.list().await {
            Ok(rows) => rows.into_iter().map(|(_, r)| r).collect(),
            Err(e) => {
                warn!("Resident lookup unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Record a new fault, then email residents and maintenance
    pub async fn submit(&self, submission: FaultSubmission) -> PortalResult<SubmissionReceipt> {
        if submission.unit_number.trim().is_empty() {
            return Err(PortalError::validation("Unit number is required"));
        }
        if submission.problem_description.trim().is_empty() {
            return Err(PortalError::validation("Problem description is required"));
        }

        let directory = self.directory().await;
        let unit = directory
            .iter()
            .find(|r| r.unit_number == submission.unit_number);
        let reporter = directory
            .iter()
            .find(|r| !r.unit_primary_name.is_empty() && r.unit_primary_name == submission.reported_by);

        let zone = unit
            .map(|r| r.zone.clone())
            .filter(|z| !z.is_empty())
            .unwrap_or_else(|| DEFAULT_ZONE.to_string());

        let now = self.clock.now();
        let stamp = self.clock.iso_now();
        let record = FaultRecord {
            timestamp: stamp.clone(),
            unit_number: submission.unit_number.clone(),
            reported_by: submission.reported_by.clone(),
            reporter_email: reporter.map(|r| r.unit_primary_email.clone()).unwrap_or_default(),
            problem_description: submission.problem_description.clone(),
            zone,
            unit_primary_name: unit.map(|r| r.unit_primary_name.clone()).unwrap_or_default(),
            unit_primary_email: unit.map(|r| r.unit_primary_email.clone()).unwrap_or_default(),
            unit_primary_phone: unit.map(|r| r.unit_primary_phone.clone()).unwrap_or_default(),
            internal_id: internal_id(&now),
            problem_status: Status::Reported.as_str().to_string(),
            problem_priority: Priority::Medium.as_str().to_string(),
            category: "General".to_string(),
            last_updated: stamp,
            reporter_phone: reporter.map(|r| r.unit_primary_phone.clone()).unwrap_or_default(),
            activity_log: "[]".to_string(),
            ..Default::default()
        };

        self.faults.append(&record).await?;
        info!("Fault {} submitted for {}", record.internal_id, record.unit_number);

        if let Err(e) = self.notifier.send_submission(&record).await {
            warn!("Submission emails for {} failed: {}", record.internal_id, e);
        }

        Ok(SubmissionReceipt {
            message: "Submitted successfully".to_string(),
            friendly_pid: record.friendly_pid(),
            internal_id: record.internal_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ActionParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
            .into()
    }

    #[test]
    fn blank_status_is_ignored_but_blank_comment_is_kept() {
        let update = ProblemUpdate::from_params(&params(&[
            ("internalId", "20250612-143015"),
            ("problemStatus", ""),
            ("comments", ""),
        ]));
        assert_eq!(update.status, None);
        assert_eq!(update.comments.as_deref(), Some(""));
        assert_eq!(update.category, None);
        assert_eq!(update.user, SYSTEM_USER);
    }

    #[test]
    fn named_user_is_recorded() {
        let update = ProblemUpdate::from_params(&params(&[("internalId", "x"), ("user", "team1")]));
        assert_eq!(update.user, "team1");
    }
}
