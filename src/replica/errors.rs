//! # Replica Errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for replica operations
pub type ReplicaResult<T> = Result<T, ReplicaError>;

/// Errors raised by the replica lifecycle
#[derive(Debug, Error)]
pub enum ReplicaError {
    #[error("{0}")]
    ReplicaNotFound(String),

    #[error("{0}")]
    ReplicaAlreadyExists(String),

    #[error("{0}")]
    FileAlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Anything the store reported, passed through untouched
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

impl ReplicaError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ReplicaError::ReplicaNotFound(_) => 404,
            ReplicaError::ReplicaAlreadyExists(_) => 409,
            ReplicaError::FileAlreadyExists(_) => 409,
            ReplicaError::Validation(_) => 400,
            ReplicaError::Store(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ReplicaError::ReplicaNotFound("x".into()).status_code(), 404);
        assert_eq!(ReplicaError::ReplicaAlreadyExists("x".into()).status_code(), 409);
        assert_eq!(ReplicaError::FileAlreadyExists("x".into()).status_code(), 409);
        assert_eq!(ReplicaError::Validation("x".into()).status_code(), 400);
        assert_eq!(
            ReplicaError::Store(StoreError::Internal("x".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_not_found_message_is_passed_through() {
        let err = ReplicaError::ReplicaNotFound("replica with id 1 was not found".into());
        assert_eq!(err.to_string(), "replica with id 1 was not found");
    }
}
