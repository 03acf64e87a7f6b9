//! Restore engine
//!
//! Replaces one schema's contents from a backup archive. The destructive
//! window is kept as small as a directory rename:
//!
//! 1. Verify the archive payload against its recorded checksum
//! 2. Safety backup of the current production schema (production target
//!    only); failure here aborts the restore before any change
//! 3. Extract into a staging sibling, rewrite the manifest for the target,
//!    validate every table in staging
//! 4. Mark the target invalid in the registry, swap staging over the
//!    target, mark valid again with provenance
//!
//! A swap failure on a production target triggers rollback from the safety
//! archive. A temporary target is replaced wholesale; no safety backup is
//! taken for it because production is never at risk.

mod errors;

pub use errors::{RestoreError, RestoreResult};

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::archive::{ArchiveErrorCode, ArchiveStore};
use crate::registry::{SchemaEntry, SchemaRegistry};
use crate::schema::{
    atomic_replace_dir, fsync_recursive, remove_dir_best_effort, staging_dir_path,
    validate_schema_dir, SchemaKind, SchemaManifest,
};
use crate::tenant::{DataLayout, TenantLockGuard};

/// Result of a completed restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub tenant_id: Uuid,
    pub archive_id: String,
    pub target: SchemaKind,
    /// Safety backup taken before a production restore
    pub safety_archive_id: Option<String>,
}

pub struct RestoreEngine {
    layout: DataLayout,
    archives: Arc<ArchiveStore>,
    registry: Arc<SchemaRegistry>,
}

impl RestoreEngine {
    pub fn new(
        layout: DataLayout,
        archives: Arc<ArchiveStore>,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            layout,
            archives,
            registry,
        }
    }

    /// Restore an archive over the tenant's production or temporary schema.
    ///
    /// The caller holds the tenant's operation lock for the full duration.
    pub fn restore(
        &self,
        tenant: Uuid,
        archive_id: &str,
        target: SchemaKind,
        _lock: &TenantLockGuard,
    ) -> RestoreResult<RestoreOutcome> {
        self.registry.get(tenant)?;

        let payload = self
            .archives
            .verify_payload(tenant, archive_id)
            .map_err(|e| match e.code() {
                ArchiveErrorCode::UvArchiveNotFound => {
                    RestoreError::ArchiveNotFound(archive_id.to_string())
                }
                _ => RestoreError::Failed(e.to_string()),
            })?;

        // Safety backup first; its failure must leave everything untouched
        let safety_archive_id = if target == SchemaKind::Production {
            let meta = self
                .archives
                .create_archive(tenant, SchemaKind::Production)
                .map_err(|source| RestoreError::SafetyBackupFailed { source })?;
            Some(meta.archive_id)
        } else {
            None
        };

        let target_dir = self.layout.schema_dir(tenant, target);
        let staging = staging_dir_path(&target_dir)
            .map_err(|e| RestoreError::Failed(e.to_string()))?;

        if let Err(e) = stage_archive(&payload, &staging, target, archive_id) {
            remove_dir_best_effort(&staging);
            return Err(e);
        }

        if target == SchemaKind::Production {
            self.registry
                .set_valid(tenant, SchemaKind::Production, false)?;
        }

        if let Err(swap_err) = atomic_replace_dir(&target_dir, &staging) {
            remove_dir_best_effort(&staging);

            return match (target, &safety_archive_id) {
                (SchemaKind::Production, Some(safety)) => {
                    self.rollback_production(tenant, safety, swap_err.to_string())
                }
                // Temporary swap failures leave the old temp (or none) in
                // place; production was never touched
                _ => Err(RestoreError::Failed(swap_err.to_string())),
            };
        }

        self.registry.set_entry(
            tenant,
            target,
            SchemaEntry::restored(Utc::now().to_rfc3339(), archive_id),
        )?;

        Ok(RestoreOutcome {
            tenant_id: tenant,
            archive_id: archive_id.to_string(),
            target,
            safety_archive_id,
        })
    }

    fn rollback_production(
        &self,
        tenant: Uuid,
        safety_archive: &str,
        reason: String,
    ) -> RestoreResult<RestoreOutcome> {
        let rollback = (|| -> RestoreResult<()> {
            let payload = self
                .archives
                .verify_payload(tenant, safety_archive)
                .map_err(|e| RestoreError::Failed(e.to_string()))?;

            let target_dir = self.layout.schema_dir(tenant, SchemaKind::Production);
            let staging = staging_dir_path(&target_dir)
                .map_err(|e| RestoreError::Failed(e.to_string()))?;

            let staged = stage_archive(&payload, &staging, SchemaKind::Production, safety_archive);
            if let Err(e) = staged {
                remove_dir_best_effort(&staging);
                return Err(e);
            }

            atomic_replace_dir(&target_dir, &staging)
                .map_err(|e| RestoreError::Failed(e.to_string()))
        })();

        match rollback {
            Ok(()) => {
                self.registry
                    .set_valid(tenant, SchemaKind::Production, true)?;
                Err(RestoreError::RolledBack {
                    reason,
                    safety_archive: safety_archive.to_string(),
                })
            }
            // The invalid marker stays set; the safety archive still holds
            // the pre-restore content for manual recovery
            Err(e) => Err(RestoreError::RollbackFailed {
                reason: format!("{}; rollback error: {}", reason, e),
                safety_archive: safety_archive.to_string(),
            }),
        }
    }
}

/// Extract an archive into a staging directory, stamp the manifest for the
/// restore target, and validate the staged schema.
fn stage_archive(
    payload: &Path,
    staging: &Path,
    target: SchemaKind,
    archive_id: &str,
) -> RestoreResult<()> {
    remove_dir_best_effort(staging);
    std::fs::create_dir_all(staging).map_err(|e| RestoreError::Failed(e.to_string()))?;

    let file = File::open(payload).map_err(|e| RestoreError::Failed(e.to_string()))?;
    let mut archive = tar::Archive::new(file);
    archive
        .unpack(staging)
        .map_err(|e| RestoreError::Failed(format!("archive extraction failed: {}", e)))?;

    // The manifest inside the archive describes the snapshot source; the
    // restored schema gets the target kind and the archive as provenance
    SchemaManifest {
        kind: target,
        created_at: Utc::now().to_rfc3339(),
        restored_from: Some(archive_id.to_string()),
    }
    .write_to_dir(staging)?;

    validate_schema_dir(staging)?;
    fsync_recursive(staging).map_err(|e| RestoreError::Failed(e.to_string()))?;
    Ok(())
}
