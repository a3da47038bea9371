//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// A persisted row could not be mapped back into the model
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}
