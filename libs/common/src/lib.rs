//! Common library for the maintenance portal
//!
//! This crate provides the pieces shared by the portal service: the
//! spreadsheet-shaped workbook store with its memory and PostgreSQL
//! backends, database connectivity, mail delivery and error types.

pub mod database;
pub mod error;
pub mod mail;
pub mod workbook;

pub use error::{StoreError, StoreResult};
pub use workbook::{Cell, Row, Table, TableId, TableKind, Workbook};
