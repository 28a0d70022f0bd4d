//! Workflows built on top of the repositories

pub mod activity;
pub mod clock;
pub mod notify;
pub mod problems;
pub mod stats;
pub mod sync;
pub mod template;

pub use clock::Clock;
pub use notify::{Notifier, NotifierSettings};
pub use problems::ProblemService;
pub use sync::DirectorySync;
