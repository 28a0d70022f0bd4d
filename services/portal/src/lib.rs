//! Lake Illawong maintenance portal service
//!
//! Serves the portal, email, explorer, management and submission
//! endpoints over a workbook of sheets and named ranges.

pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

pub use config::Settings;
pub use error::{PortalError, PortalResult};
pub use routes::create_router;
pub use state::AppState;
