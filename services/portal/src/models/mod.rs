//! Records stored in the workbook

pub mod activity;
pub mod fault;
pub mod resident;
pub mod template;
pub mod user;

pub use activity::{ActivityEntry, ChangeType, FieldChange};
pub use fault::{FAULT_LOG_SHEET, FaultRecord, Priority, Status};
pub use resident::{Resident, UNIT_LIST_SHEET};
pub use template::{EMAIL_TEMPLATE_RANGE, EmailTemplate, TemplateInput};
pub use user::{Role, USER_ACCOUNTS_SHEET, UserAccount, UserProfile};
