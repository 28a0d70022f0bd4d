//! Application state shared across handlers

use common::{Workbook, mail::Mailer};
use std::sync::Arc;

use crate::config::Settings;
use crate::repositories::{
    DropdownRepository, EmailConfigRepository, FaultRepository, NamedRangeRepository,
    ResidentRepository, TemplateRepository, UserRepository,
};
use crate::services::{Clock, DirectorySync, Notifier, NotifierSettings, ProblemService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub clock: Clock,
    pub workbook: Workbook,
    pub faults: FaultRepository,
    pub dropdowns: DropdownRepository,
    pub ranges: NamedRangeRepository,
    pub users: UserRepository,
    pub templates: TemplateRepository,
    pub email_config: EmailConfigRepository,
    pub residents: ResidentRepository,
    pub notifier: Notifier,
    pub problems: ProblemService,
    pub directory: DirectorySync,
}

impl AppState {
    pub fn new(settings: Settings, workbook: Workbook, mailer: Arc<dyn Mailer>) -> Self {
        let clock = Clock::new(settings.portal.tz());

        let faults = FaultRepository::new(workbook.clone());
        let dropdowns = DropdownRepository::new(workbook.clone());
        let ranges = NamedRangeRepository::new(workbook.clone());
        let users = UserRepository::new(
            workbook.clone(),
            settings.auth.seed_accounts.clone(),
            clock,
        );
        let templates = TemplateRepository::new(workbook.clone());
        let email_config = EmailConfigRepository::new(workbook.clone());
        let residents = ResidentRepository::new(workbook.clone());

        let notifier = Notifier::new(
            mailer,
            workbook.clone(),
            clock,
            NotifierSettings {
                portal_url: settings.portal.portal_url.clone(),
                fallback_email: settings.portal.maintenance_fallback_email.clone(),
                daily_quota: u64::from(settings.mail.daily_quota),
            },
        );
        let problems = ProblemService::new(
            faults.clone(),
            residents.clone(),
            notifier.clone(),
            clock,
            settings.portal.activity_log_limit,
        );
        let directory = DirectorySync::new(
            residents.clone(),
            dropdowns.clone(),
            ranges.clone(),
            clock,
        );

        Self {
            settings: Arc::new(settings),
            clock,
            workbook,
            faults,
            dropdowns,
            ranges,
            users,
            templates,
            email_config,
            residents,
            notifier,
            problems,
            directory,
        }
    }
}
