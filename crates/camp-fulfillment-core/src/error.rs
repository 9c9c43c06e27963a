//! Engine error types.

use std::fmt;

use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::db::DbError;

/// Entity named by a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Camp,
    Package,
    Service,
    Technician,
    Patient,
    Batch,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Camp => "Camp",
            EntityKind::Package => "Package",
            EntityKind::Service => "Service",
            EntityKind::Technician => "Technician",
            EntityKind::Patient => "Patient",
            EntityKind::Batch => "Intake batch",
        };
        f.write_str(name)
    }
}

/// Errors from engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lock contention or timeout. Retrying the call may succeed.
    #[error("Store temporarily unavailable: {0}")]
    TransientStore(String),

    #[error("Stored artifact failed verification: {0}")]
    ArtifactCorrupt(String),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for EngineError {
    fn from(e: DbError) -> Self {
        if e.is_busy() {
            EngineError::TransientStore(e.to_string())
        } else if e.is_unique_violation() {
            EngineError::Conflict(e.to_string())
        } else {
            EngineError::Database(e)
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::from(e).into()
    }
}

impl EngineError {
    pub fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::TransientStore(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn sqlite_failure(code: i32) -> DbError {
        DbError::Sqlite(rusqlite::Error::SqliteFailure(ffi::Error::new(code), None))
    }

    #[test]
    fn test_busy_maps_to_transient() {
        let err: EngineError = sqlite_failure(ffi::SQLITE_BUSY).into();
        assert!(err.is_retryable());

        let err: EngineError = sqlite_failure(ffi::SQLITE_LOCKED).into();
        assert!(matches!(err, EngineError::TransientStore(_)));
    }

    #[test]
    fn test_unique_maps_to_conflict() {
        let err: EngineError = sqlite_failure(ffi::SQLITE_CONSTRAINT_UNIQUE).into();
        assert!(matches!(err, EngineError::Conflict(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found(EntityKind::Technician, "t-42");
        assert_eq!(err.to_string(), "Technician not found: t-42");
    }
}
