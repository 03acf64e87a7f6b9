//! Restore error types
//!
//! The variants encode where in the restore sequence the failure happened,
//! because the caller's recovery story differs:
//!
//! - before the destructive phase: the target schema is untouched
//! - during the destructive phase with a successful rollback: the target
//!   schema equals its pre-restore content
//! - rollback failure: manual intervention, the schema stays marked invalid

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::registry::RegistryError;
use crate::schema::SchemaError;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("archive not found: {0}")]
    ArchiveNotFound(String),

    #[error("safety backup failed, restore aborted before any change: {source}")]
    SafetyBackupFailed {
        #[source]
        source: ArchiveError,
    },

    #[error("restore failed before the destructive phase, target schema untouched: {0}")]
    Failed(String),

    #[error(
        "restore failed and was rolled back from safety archive {safety_archive}: {reason}"
    )]
    RolledBack {
        reason: String,
        safety_archive: String,
    },

    #[error(
        "restore failed and rollback from {safety_archive} also failed, schema left invalid: {reason}"
    )]
    RollbackFailed {
        reason: String,
        safety_archive: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<SchemaError> for RestoreError {
    fn from(e: SchemaError) -> Self {
        RestoreError::Failed(e.to_string())
    }
}

pub type RestoreResult<T> = Result<T, RestoreError>;
