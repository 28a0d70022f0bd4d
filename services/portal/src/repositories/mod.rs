//! Typed access to the sheets and named ranges of the workbook

pub mod dropdowns;
pub mod email_config;
pub mod email_log;
pub mod faults;
pub mod named_ranges;
pub mod residents;
pub mod templates;
pub mod users;

pub use dropdowns::DropdownRepository;
pub use email_config::{EmailConfig, EmailConfigRepository};
pub use email_log::EmailLogRepository;
pub use faults::FaultRepository;
pub use named_ranges::NamedRangeRepository;
pub use residents::ResidentRepository;
pub use templates::TemplateRepository;
pub use users::UserRepository;
