//! Registry error types

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown tenant: {0}")]
    UnknownTenant(Uuid),

    #[error("tenant already exists: {0}")]
    TenantExists(Uuid),

    #[error("tenant {0} has no temporary schema")]
    NoTempSchema(Uuid),

    #[error("registry I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt registry file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl RegistryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
