//! Reconciliation error types
//!
//! These cover failures of the operation itself. Per-row problems are not
//! errors here; they land in the report.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::SchemaError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("source schema not found: {0}")]
    SourceMissing(PathBuf),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
