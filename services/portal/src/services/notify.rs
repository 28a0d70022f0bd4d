//! Email notifications: recipients, message text, delivery and the log
//!
//! Three workflows send mail. A new fault report goes to the residents of
//! the unit and to the maintenance team, a completed problem goes to the
//! people chosen by the completion rule, and a mass notification goes to
//! every unit primary matching a filter.

use chrono::Duration;
use common::mail::{Mailer, OutgoingEmail};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{PortalError, PortalResult};
use crate::models::fault::FaultRecord;
use crate::repositories::email_config::{CompletionRule, EmailConfig};
use crate::repositories::email_log::{LogEntry, LogRecord};
use crate::repositories::named_ranges::{MTCE_TEAM_RANGE, ZONE_REP_RANGE};
use crate::repositories::{
    EmailConfigRepository, EmailLogRepository, ResidentRepository, TemplateRepository,
};
use crate::services::clock::Clock;
use crate::services::template::{RenderedEmail, render};

pub const TYPE_UNIT_PRIMARY: &str = "Unit Primary";
pub const TYPE_ZONE_REP: &str = "Zone Representative";
pub const TYPE_REPORTER: &str = "Reporter";
pub const TYPE_MAINTENANCE: &str = "Maintenance Team";

const ADMIN_AUTO: &str = "Auto";

/// Someone an email goes to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Recipient {
    fn named(email: impl Into<String>, name: impl Into<String>, kind: &'static str) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
            unit: None,
            zone: None,
            kind,
        }
    }

    fn unit_primary(problem: &FaultRecord) -> Option<Self> {
        if problem.unit_primary_email.trim().is_empty() {
            return None;
        }
        let name = if problem.unit_primary_name.is_empty() {
            TYPE_UNIT_PRIMARY.to_string()
        } else {
            problem.unit_primary_name.clone()
        };
        Some(Self::named(&problem.unit_primary_email, name, TYPE_UNIT_PRIMARY))
    }
}

/// Outcome of one group of notifications
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub success: bool,
    pub recipients: Vec<Recipient>,
    pub emails_sent: usize,
}

impl DeliveryReport {
    fn empty() -> Self {
        Self {
            success: true,
            recipients: Vec::new(),
            emails_sent: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub resident_emails: DeliveryReport,
    pub maintenance_emails: DeliveryReport,
    pub total_emails_sent: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub recipients: Vec<Recipient>,
    pub emails_sent: usize,
    pub method: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassReport {
    pub method: &'static str,
    pub recipients: Vec<Recipient>,
    pub recipient_count: usize,
    pub email_count: usize,
    pub unit_count: usize,
    pub template: RenderedEmail,
}

/// Delivery totals derived from the email log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub today_email_count: u64,
    pub max_emails_per_day: u64,
    pub emails_remaining: u64,
    pub week_total_count: u64,
    pub recent_activity: Vec<LogRecord>,
    pub system_status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quota {
    pub remaining: u64,
    pub quota: u64,
    pub used: u64,
}

/// Link to the maintenance portal pre-filtered to one problem
pub fn portal_link(portal_url: &str, internal_id: &str) -> String {
    let pid = crate::models::fault::friendly_pid(internal_id);
    format!("{}?search={}", portal_url, urlencoding::encode(&pid))
}

pub fn completion_email(problem: &FaultRecord) -> RenderedEmail {
    let pid = problem.friendly_pid();
    let subject = format!("Problem Completed - {} - {}", pid, problem.unit_number);
    let body = format!(
        "Good news! The maintenance request for {unit} has been completed.

Problem Details:
• Problem ID: {pid}
• Unit: {unit}
• Description: {description}
• Completed Date: {completed}

The issue has been resolved by our maintenance team.

Should you have any queries regarding this problem, please contact our Maintenance team.

Thank you for your patience.

---
Lake Illawong Maintenance Team",
        unit = problem.unit_number,
        pid = pid,
        description = problem.problem_description,
        completed = problem.completion_date,
    );
    RenderedEmail { subject, body }
}

pub fn resident_email(problem: &FaultRecord, clock: &Clock) -> RenderedEmail {
    let pid = problem.friendly_pid();
    let subject = format!("Fault Report {} - {}", pid, problem.unit_number);
    let body = format!(
        "PROBLEM REPORT NOTIFICATION

Report ID: {pid}
Location: {unit}
Reported By: {reporter}
Reported: {reported}

Problem Description:
{description}

Make a note of the Report ID and quote this in any communication you may have with the Maintenance Team.

This is an automated notification from the Lake Illawong Fault Reporting System.

---
Do not reply to this email. Please do not re-report this problem. For questions, contact the maintenance team.",
        pid = pid,
        unit = problem.unit_number,
        reporter = problem.reported_by,
        reported = clock.long_form(&problem.timestamp),
        description = problem.problem_description,
    );
    RenderedEmail { subject, body }
}

pub fn maintenance_email(problem: &FaultRecord, clock: &Clock, portal_url: &str) -> RenderedEmail {
    let pid = problem.friendly_pid();
    let subject = format!(
        "🔧 NEW FAULT REPORT: {} - {} - {} Priority",
        pid, problem.unit_number, problem.problem_priority
    );
    let body = format!(
        "MAINTENANCE TEAM NOTIFICATION

NEW FAULT REPORT SUBMITTED

Report ID: {pid}
Internal ID: {internal_id}
Location: {unit} ({zone})
Reported By: {reporter}
Submitted: {submitted}
Priority: {priority}
Status: {status}

PROBLEM DETAILS:
{description}

CONTACT INFORMATION:
Unit Primary: {primary_name}
Unit Primary Email: {primary_email}
Unit Primary Phone: {primary_phone}
Reporter Email: {reporter_email}
Reporter Phone: {reporter_phone}

MAINTENANCE PORTAL:
View and manage this fault: {link}

QUICK ACTIONS:
• Update status and priority
• Assign to team member
• Add maintenance comments
• Mark as completed

═══════════════════════════════════════
This is an automated notification from the Lake Illawong Fault Reporting System.

Please do not reply to this email. Use the maintenance portal link above to manage this fault report.",
        pid = pid,
        internal_id = problem.internal_id,
        unit = problem.unit_number,
        zone = problem.zone,
        reporter = problem.reported_by,
        submitted = clock.long_form(&problem.timestamp),
        priority = problem.problem_priority,
        status = problem.problem_status,
        description = problem.problem_description,
        primary_name = problem.unit_primary_name,
        primary_email = problem.unit_primary_email,
        primary_phone = problem.unit_primary_phone,
        reporter_email = problem.reporter_email,
        reporter_phone = problem.reporter_phone,
        link = portal_link(portal_url, &problem.internal_id),
    );
    RenderedEmail { subject, body }
}

/// Keep the first recipient for each address
fn dedupe(recipients: Vec<Recipient>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    recipients
        .into_iter()
        .filter(|r| seen.insert(r.email.clone()))
        .collect()
}

/// Email notifier
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    config: EmailConfigRepository,
    log: EmailLogRepository,
    residents: ResidentRepository,
    templates: TemplateRepository,
    workbook: common::Workbook,
    clock: Clock,
    portal_url: String,
    fallback_email: String,
    daily_quota: u64,
}

/// Addresses and limits the notifier works with
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub portal_url: String,
    pub fallback_email: String,
    pub daily_quota: u64,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        workbook: common::Workbook,
        clock: Clock,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            mailer,
            config: EmailConfigRepository::new(workbook.clone()),
            log: EmailLogRepository::new(workbook.clone()),
            residents: ResidentRepository::new(workbook.clone()),
            templates: TemplateRepository::new(workbook.clone()),
            workbook,
            clock,
            portal_url: settings.portal_url,
            fallback_email: settings.fallback_email,
            daily_quota: settings.daily_quota,
        }
    }

    pub async fn config(&self) -> EmailConfig {
        self.config.load().await
    }

    /// Record a delivery unless logging is switched off
    async fn record(&self, config: &EmailConfig, entry: LogEntry) {
        if config.log_email_delivery() {
            self.log.record(&self.clock.iso_now(), &entry).await;
        }
    }

    async fn deliver(&self, to: Vec<String>, email: &RenderedEmail) -> PortalResult<()> {
        let message = OutgoingEmail {
            to,
            subject: email.subject.clone(),
            body: email.body.clone(),
        };
        self.mailer.send(&message).await?;
        Ok(())
    }

    /// Representatives listed for a zone; only the first one unless
    /// multi-rep delivery is enabled
    pub async fn zone_reps(&self, zone: &str, config: &EmailConfig) -> Vec<Recipient> {
        if zone.is_empty() {
            return Vec::new();
        }
        let table = match self.workbook.named_range(ZONE_REP_RANGE).await {
            Ok(Some(table)) => table,
            Ok(None) => {
                warn!("{} named range not found", ZONE_REP_RANGE);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read {}: {}", ZONE_REP_RANGE, e);
                return Vec::new();
            }
        };

        let mut reps: Vec<Recipient> = table
            .rows()
            .iter()
            .filter(|row| row.first().map(|c| c.text()).as_deref() == Some(zone))
            .filter_map(|row| {
                let email = row.get(2)?.trimmed();
                if email.is_empty() {
                    return None;
                }
                let name = row.get(1).map(|c| c.text()).unwrap_or_default();
                let name = if name.is_empty() { format!("{} Rep", zone) } else { name };
                Some(Recipient::named(email, name, TYPE_ZONE_REP))
            })
            .collect();

        if !config.multi_zone_rep_enabled() {
            reps.truncate(1);
        }
        info!("Found {} zone rep(s) for {}", reps.len(), zone);
        reps
    }

    /// Maintenance team addresses, or the fallback address when none is listed
    pub async fn maintenance_emails(&self) -> Vec<String> {
        let emails: Vec<String> = match self.workbook.named_range(MTCE_TEAM_RANGE).await {
            Ok(Some(table)) => table
                .rows()
                .iter()
                .filter_map(|row| row.get(1).map(|c| c.trimmed()))
                .filter(|email| email.contains('@'))
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read {}: {}", MTCE_TEAM_RANGE, e);
                Vec::new()
            }
        };

        if emails.is_empty() {
            warn!("No maintenance team emails found, using fallback");
            return vec![self.fallback_email.clone()];
        }
        emails
    }

    /// Recipients chosen by the completion rule, one entry per address
    pub async fn completion_recipients(&self, problem: &FaultRecord, config: &EmailConfig) -> Vec<Recipient> {
        let Some(rule) = config.completion_rule() else {
            warn!("Unknown completion notification rule; nobody selected");
            return Vec::new();
        };

        let primary = Recipient::unit_primary(problem);
        let recipients = match rule {
            CompletionRule::UnitPrimaryFirst => match primary {
                Some(primary) => vec![primary],
                None => self.zone_reps(&problem.zone, config).await,
            },
            CompletionRule::ZoneRepAlways => self.zone_reps(&problem.zone, config).await,
            CompletionRule::Both => {
                let mut recipients: Vec<Recipient> = primary.into_iter().collect();
                recipients.extend(self.zone_reps(&problem.zone, config).await);
                recipients
            }
        };
        dedupe(recipients)
    }

    /// Unit primary, zone reps and a distinct reporter, one entry per address
    pub async fn resident_recipients(&self, problem: &FaultRecord, config: &EmailConfig) -> Vec<Recipient> {
        let mut recipients: Vec<Recipient> = Recipient::unit_primary(problem).into_iter().collect();
        recipients.extend(self.zone_reps(&problem.zone, config).await);

        let reporter_differs = problem.reported_by != problem.unit_primary_name;
        if reporter_differs
            && !problem.reporter_email.trim().is_empty()
            && problem.reporter_email != problem.unit_primary_email
        {
            recipients.push(Recipient::named(
                &problem.reporter_email,
                &problem.reported_by,
                TYPE_REPORTER,
            ));
        }
        dedupe(recipients)
    }

    /// Tell the unit that a problem was completed, one email per recipient
    pub async fn send_completion(&self, problem: &FaultRecord) -> PortalResult<CompletionReport> {
        let config = self.config().await;
        match self.try_send_completion(problem, &config).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Completion notification for {} failed: {}", problem.internal_id, e);
                self.record(&config, LogEntry::failed("Completion", e.to_string()).admin(ADMIN_AUTO))
                    .await;
                Err(e)
            }
        }
    }

    async fn try_send_completion(&self, problem: &FaultRecord, config: &EmailConfig) -> PortalResult<CompletionReport> {
        let recipients = self.completion_recipients(problem, config).await;
        if recipients.is_empty() {
            return Err(PortalError::validation(
                "No valid recipients found for completion notification",
            ));
        }

        let email = completion_email(problem);
        for recipient in &recipients {
            self.deliver(vec![recipient.email.clone()], &email).await?;
        }

        self.record(
            config,
            LogEntry::success("Completion", &email.subject, recipients.len()).admin(ADMIN_AUTO),
        )
        .await;
        info!("Completion notification for {} sent to {} recipient(s)", problem.internal_id, recipients.len());

        Ok(CompletionReport {
            emails_sent: recipients.len(),
            recipients,
            method: "direct_email",
        })
    }

    /// Acknowledge a new fault report to the residents and alert the team
    pub async fn send_submission(&self, problem: &FaultRecord) -> PortalResult<SubmissionReport> {
        let config = self.config().await;
        match self.try_send_submission(problem, &config).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Submission emails for {} failed: {}", problem.internal_id, e);
                self.record(&config, LogEntry::failed("ProblemSubmission", e.to_string()).admin(ADMIN_AUTO))
                    .await;
                Err(e)
            }
        }
    }

    async fn try_send_submission(&self, problem: &FaultRecord, config: &EmailConfig) -> PortalResult<SubmissionReport> {
        let residents = self.resident_recipients(problem, config).await;
        let resident_emails = if residents.is_empty() {
            DeliveryReport::empty()
        } else {
            let to = residents.iter().map(|r| r.email.clone()).collect();
            self.deliver(to, &resident_email(problem, &self.clock)).await?;
            DeliveryReport {
                success: true,
                emails_sent: residents.len(),
                recipients: residents,
            }
        };

        let team = self.maintenance_emails().await;
        let maintenance_emails = if team.is_empty() {
            DeliveryReport::empty()
        } else {
            let email = maintenance_email(problem, &self.clock, &self.portal_url);
            self.deliver(team.clone(), &email).await?;
            DeliveryReport {
                success: true,
                emails_sent: team.len(),
                recipients: team
                    .into_iter()
                    .map(|email| Recipient {
                        email,
                        name: None,
                        unit: None,
                        zone: None,
                        kind: TYPE_MAINTENANCE,
                    })
                    .collect(),
            }
        };

        let total = resident_emails.emails_sent + maintenance_emails.emails_sent;
        self.record(
            config,
            LogEntry::success(
                "ProblemSubmission",
                format!("Problem {} submitted", problem.friendly_pid()),
                total,
            )
            .admin(ADMIN_AUTO),
        )
        .await;

        Ok(SubmissionReport {
            resident_emails,
            maintenance_emails,
            total_emails_sent: total,
        })
    }

    /// Unit primaries with a usable address, narrowed by `zone_N` filters
    pub async fn mass_recipients(&self, filter: &str) -> PortalResult<Vec<Recipient>> {
        let target_zone = filter
            .strip_prefix("zone_")
            .filter(|n| matches!(*n, "1" | "2" | "3" | "4" | "5"))
            .map(|n| format!("Zone {}", n));

        Ok(self
            .residents
            .list()
            .await?
            .into_iter()
            .map(|(_, resident)| resident)
            .filter(|r| r.unit_primary_email.contains('@'))
            .filter(|r| target_zone.as_ref().is_none_or(|zone| &r.zone == zone))
            .map(|r| {
                let name = if r.unit_primary_name.is_empty() {
                    format!("Unit {}", r.unit_number)
                } else {
                    r.unit_primary_name.clone()
                };
                Recipient {
                    email: r.unit_primary_email.trim().to_string(),
                    name: Some(name),
                    unit: Some(r.unit_number),
                    zone: Some(r.zone),
                    kind: TYPE_UNIT_PRIMARY,
                }
            })
            .collect())
    }

    /// Send one templated email to every matching unit primary
    pub async fn send_mass(
        &self,
        template_id: &str,
        data: &Map<String, Value>,
        filter: &str,
        admin_user: Option<&str>,
    ) -> PortalResult<MassReport> {
        let config = self.config().await;
        let admin = admin_user.unwrap_or("Admin1");
        match self.try_send_mass(template_id, data, filter, admin, &config).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Mass notification {} failed: {}", template_id, e);
                let entry = LogEntry::failed("MassNotification", e.to_string())
                    .admin(admin_user.unwrap_or("Unknown"));
                self.record(&config, entry).await;
                Err(e)
            }
        }
    }

    async fn try_send_mass(
        &self,
        template_id: &str,
        data: &Map<String, Value>,
        filter: &str,
        admin: &str,
        config: &EmailConfig,
    ) -> PortalResult<MassReport> {
        if !config.mass_notification_enabled() {
            return Err(PortalError::validation("Mass notifications are disabled"));
        }

        let template = match self.templates.find(template_id).await {
            Ok(template) => template,
            Err(e) => {
                warn!("Failed to load template {}: {}", template_id, e);
                None
            }
        }
        .ok_or_else(|| PortalError::not_found(format!("Template {} not found", template_id)))?;

        let recipients = self.mass_recipients(filter).await?;
        if recipients.is_empty() {
            return Err(PortalError::validation("No recipients found for mass notification"));
        }

        let email = render(&template, data, &self.clock.now());
        let to = recipients.iter().map(|r| r.email.clone()).collect();
        self.deliver(to, &email).await?;

        self.record(
            config,
            LogEntry::success("MassNotification", &email.subject, recipients.len())
                .template(template_id)
                .admin(admin),
        )
        .await;
        info!("Mass notification {} sent to {} recipients", template_id, recipients.len());

        let unit_count = recipients
            .iter()
            .filter_map(|r| r.unit.as_deref())
            .filter(|unit| !unit.is_empty())
            .collect::<HashSet<_>>()
            .len();
        Ok(MassReport {
            method: "direct_email",
            recipient_count: recipients.len(),
            email_count: recipients.len(),
            unit_count,
            recipients,
            template: email,
        })
    }

    /// Emails sent today, counted from successful log rows
    fn today_count(&self, records: &[LogRecord]) -> u64 {
        let today = self.clock.today_date();
        records
            .iter()
            .filter(|r| r.is_success())
            .filter(|r| {
                self.clock
                    .parse(&r.timestamp)
                    .is_some_and(|at| at.date_naive() == today)
            })
            .map(LogRecord::weight)
            .sum()
    }

    pub async fn quota(&self) -> PortalResult<Quota> {
        let records = self.log.records().await?;
        let used = self.today_count(&records);
        Ok(Quota {
            remaining: self.daily_quota.saturating_sub(used),
            quota: self.daily_quota,
            used,
        })
    }

    pub async fn stats(&self) -> PortalResult<EmailStats> {
        let records = self.log.records().await?;
        let today = self.today_count(&records);

        let week_ago = self.clock.now() - Duration::days(7);
        let week: u64 = records
            .iter()
            .filter(|r| r.is_success())
            .filter(|r| self.clock.parse(&r.timestamp).is_some_and(|at| at >= week_ago))
            .map(LogRecord::weight)
            .sum();

        let recent_activity = records
            .iter()
            .rev()
            .take(5)
            .filter(|r| !r.timestamp.is_empty())
            .cloned()
            .collect();

        Ok(EmailStats {
            today_email_count: today,
            max_emails_per_day: self.daily_quota,
            emails_remaining: self.daily_quota.saturating_sub(today),
            week_total_count: week,
            recent_activity,
            system_status: "Active",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem() -> FaultRecord {
        FaultRecord {
            internal_id: "20250612-143015".into(),
            unit_number: "Unit 12".into(),
            problem_description: "Leaking tap".into(),
            completion_date: "2025-06-20".into(),
            problem_priority: "High".into(),
            ..Default::default()
        }
    }

    #[test]
    fn portal_link_encodes_friendly_pid() {
        assert_eq!(
            portal_link("https://portal.example/p.html", "20250612-143015"),
            "https://portal.example/p.html?search=PID%20143015"
        );
    }

    #[test]
    fn completion_email_names_problem_and_unit() {
        let email = completion_email(&problem());
        assert_eq!(email.subject, "Problem Completed - PID 143015 - Unit 12");
        assert!(email.body.starts_with("Good news! The maintenance request for Unit 12"));
        assert!(email.body.contains("• Completed Date: 2025-06-20"));
    }

    #[test]
    fn maintenance_subject_carries_priority() {
        let clock = Clock::new(chrono_tz::Australia::Sydney);
        let email = maintenance_email(&problem(), &clock, "https://portal.example");
        assert_eq!(
            email.subject,
            "🔧 NEW FAULT REPORT: PID 143015 - Unit 12 - High Priority"
        );
        assert!(email.body.contains("?search=PID%20143015"));
    }

    #[test]
    fn dedupe_keeps_first_address() {
        let recipients = vec![
            Recipient::named("a@x.org", "Ann", TYPE_UNIT_PRIMARY),
            Recipient::named("a@x.org", "Ann again", TYPE_REPORTER),
            Recipient::named("b@x.org", "Bo", TYPE_ZONE_REP),
        ];
        let unique = dedupe(recipients);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].kind, TYPE_UNIT_PRIMARY);
    }
}
