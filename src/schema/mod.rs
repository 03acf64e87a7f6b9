//! Tenant schema directories
//!
//! A schema is a directory holding one JSON table per entity type plus a
//! `schema_manifest.json` with kind and provenance. A tenant always has a
//! production schema; a temporary schema exists only between a
//! restore-to-temp and the following promotion or discard.

mod fsops;
mod tables;

pub use fsops::{
    atomic_replace_dir, fsync_dir, fsync_recursive, old_dir_path, remove_dir_best_effort,
    staging_dir_path, write_atomic,
};
pub use tables::{entity_counts, natural_keys, validate_tables, EntityTable};
pub(crate) use tables::with_entity_record;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// Schema manifest file name inside a schema directory.
pub const SCHEMA_MANIFEST: &str = "schema_manifest.json";

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema-level errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema directory not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid schema manifest: {0}")]
    Manifest(String),

    #[error("invalid {entity} table: {reason}")]
    Table { entity: EntityType, reason: String },
}

impl SchemaError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        SchemaError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Schema kind. A tenant has exactly one Production schema at all times and
/// at most one Temporary schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Production,
    Temporary,
}

impl SchemaKind {
    /// Directory name under the tenant directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SchemaKind::Production => "prod",
            SchemaKind::Temporary => "temp",
        }
    }

    /// Map the wire-level `to_temp`/`from_temp` flag to a kind.
    pub fn from_temp_flag(temp: bool) -> Self {
        if temp {
            SchemaKind::Temporary
        } else {
            SchemaKind::Production
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Production => "production",
            SchemaKind::Temporary => "temporary",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Manifest stored inside every schema directory (and therefore inside
/// every archive of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub kind: SchemaKind,
    /// RFC3339 creation time of this schema's content
    pub created_at: String,
    /// Archive this schema was restored from, if any
    #[serde(default)]
    pub restored_from: Option<String>,
}

impl SchemaManifest {
    pub fn new(kind: SchemaKind, restored_from: Option<String>) -> Self {
        Self {
            kind,
            created_at: Utc::now().to_rfc3339(),
            restored_from,
        }
    }

    /// Write the manifest into a schema directory with fsync.
    pub fn write_to_dir(&self, schema_dir: &Path) -> SchemaResult<()> {
        let path = schema_dir.join(SCHEMA_MANIFEST);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SchemaError::Manifest(e.to_string()))?;
        fsops::write_atomic(&path, json.as_bytes()).map_err(|e| SchemaError::io(&path, e))
    }

    /// Read the manifest from a schema directory.
    pub fn read_from_dir(schema_dir: &Path) -> SchemaResult<Self> {
        let path = schema_dir.join(SCHEMA_MANIFEST);
        let contents =
            std::fs::read_to_string(&path).map_err(|e| SchemaError::io(&path, e))?;
        serde_json::from_str(&contents).map_err(|e| SchemaError::Manifest(e.to_string()))
    }
}

/// Create a fresh schema directory: manifest plus one empty table per
/// entity type.
pub fn init_schema_dir(
    schema_dir: &Path,
    kind: SchemaKind,
    restored_from: Option<String>,
) -> SchemaResult<()> {
    std::fs::create_dir_all(schema_dir).map_err(|e| SchemaError::io(schema_dir, e))?;

    SchemaManifest::new(kind, restored_from).write_to_dir(schema_dir)?;

    for entity in EntityType::ALL {
        tables::write_empty_table(schema_dir, entity)?;
    }

    fsync_dir(schema_dir).map_err(|e| SchemaError::io(schema_dir, e))?;
    Ok(())
}

/// Validate that a directory holds a complete, parseable schema.
///
/// Used by the restore engine before any destructive phase: the manifest
/// must parse and every entity table must deserialize into its typed form.
pub fn validate_schema_dir(schema_dir: &Path) -> SchemaResult<SchemaManifest> {
    if !schema_dir.is_dir() {
        return Err(SchemaError::NotFound(schema_dir.to_path_buf()));
    }

    let manifest = SchemaManifest::read_from_dir(schema_dir)?;
    validate_tables(schema_dir)?;
    Ok(manifest)
}
