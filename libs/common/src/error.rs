//! Error types shared by the workbook store and its backends

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Error type for workbook storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while connecting to the backing database
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during schema migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Store configuration error: {0}")]
    Configuration(String),

    /// A sheet addressed by name does not exist
    #[error("{0} sheet not found")]
    SheetNotFound(String),

    /// A named range addressed by name does not exist
    #[error("Named range '{0}' not found")]
    RangeNotFound(String),

    /// Stored rows or an imported snapshot could not be decoded
    #[error("Invalid workbook data: {0}")]
    Seed(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
