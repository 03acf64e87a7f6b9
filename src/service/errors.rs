//! Service error type
//!
//! Wraps the subsystem errors so HTTP handlers map one type to status
//! codes. `TargetBusy` is the fail-fast answer when another operation on
//! the same tenant is in flight.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::archive::ArchiveError;
use crate::promotion::PromotionError;
use crate::reconcile::ReconcileError;
use crate::registry::RegistryError;
use crate::restore::RestoreError;
use crate::schema::{SchemaError, SchemaKind};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("another operation on tenant {0} is in progress")]
    TargetBusy(Uuid),

    #[error("{kind} schema of tenant {tenant} is marked invalid")]
    SchemaInvalid { tenant: Uuid, kind: SchemaKind },

    #[error("data directory {0} unusable: {1}")]
    DataDir(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
