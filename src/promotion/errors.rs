//! Promotion error types

use thiserror::Error;
use uuid::Uuid;

use crate::archive::ArchiveError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum PromotionError {
    #[error("tenant {0} has no temporary schema to promote")]
    NoTempSchema(Uuid),

    #[error("safety backup failed, promotion aborted before any change: {source}")]
    SafetyBackupFailed {
        #[source]
        source: ArchiveError,
    },

    #[error("promotion swap failed, production untouched and temporary retained: {0}")]
    SwapFailed(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type PromotionResult<T> = Result<T, PromotionError>;
