//! Archive store
//!
//! Durable storage of backup snapshots plus their metadata.
//!
//! - The payload is an immutable tar of one schema directory
//! - Metadata (title, description, location flags) lives in a per-tenant
//!   JSON index, editable without touching the payload
//! - An archive may exist locally, remotely, or both
//! - Zero partial success: a failed creation leaves nothing registered
//!
//! # Creation sequence
//!
//! 1. Verify the source schema directory exists
//! 2. Pack the schema directory into `<archive_id>.tar`, fsync
//! 3. Checksum the payload (CRC32)
//! 4. Register the entry in the tenant's index (atomic write)
//!
//! A failure at any step removes the partial tar; the index is only
//! written after the payload is durable.

mod errors;
mod meta;
mod packer;
mod remote;

pub use errors::{ArchiveError, ArchiveErrorCode, ArchiveResult, Severity};
pub use meta::{ArchiveIndex, ArchiveMeta};
pub use packer::{compute_file_checksum, create_tar_archive};
pub use remote::{DirRemoteStore, RemoteStore};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::schema::SchemaKind;
use crate::tenant::DataLayout;

use packer::cleanup_partial_archive;

/// Archive ID type (timestamp basic format plus a random suffix)
pub type ArchiveId = String;

/// Generate a new archive id: `YYYYMMDDTHHMMSSZ-xxxxxxxx`.
///
/// The suffix keeps ids unique when archives for different schemas land in
/// the same second.
pub fn generate_archive_id() -> ArchiveId {
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", stamp, &suffix[..8])
}

/// Store for backup archives of tenant schemas.
pub struct ArchiveStore {
    layout: DataLayout,
    remote: Box<dyn RemoteStore>,
    /// Serializes index read-modify-write cycles, one lock per tenant so
    /// tenants never wait on each other
    index_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ArchiveStore {
    pub fn new(layout: DataLayout, remote: Box<dyn RemoteStore>) -> Self {
        Self {
            layout,
            remote,
            index_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot a schema's full contents into a new immutable archive.
    ///
    /// # Errors
    ///
    /// - `UV_ARCHIVE_SOURCE_MISSING` when the schema directory does not exist
    /// - `UV_ARCHIVE_WRITE` on I/O failure; no partial archive stays
    ///   registered and the partial tar is removed
    pub fn create_archive(&self, tenant: Uuid, kind: SchemaKind) -> ArchiveResult<ArchiveMeta> {
        let schema_dir = self.layout.schema_dir(tenant, kind);
        if !schema_dir.is_dir() {
            return Err(ArchiveError::source_schema_not_found(format!(
                "{} schema for tenant {} does not exist",
                kind, tenant
            )));
        }

        let archive_id = generate_archive_id();
        let archive_path = self.layout.archive_file(tenant, &archive_id);

        let archives_dir = self.layout.archives_dir(tenant);
        std::fs::create_dir_all(&archives_dir)
            .map_err(|e| ArchiveError::io_error_at_path(&archives_dir, e))?;

        let result = (|| -> ArchiveResult<ArchiveMeta> {
            create_tar_archive(&schema_dir, &archive_path)?;

            let checksum = compute_file_checksum(&archive_path)?;
            let size_bytes = std::fs::metadata(&archive_path)
                .map_err(|e| ArchiveError::io_error_at_path(&archive_path, e))?
                .len();

            let meta = ArchiveMeta {
                archive_id: archive_id.clone(),
                tenant_id: tenant,
                schema_kind: kind,
                created_at: Utc::now().to_rfc3339(),
                size_bytes,
                checksum,
                local: true,
                remote: false,
                title: None,
                description: None,
            };

            self.with_index(tenant, |index| {
                index.archives.push(meta.clone());
                Ok(())
            })?;

            Ok(meta)
        })();

        if result.is_err() {
            cleanup_partial_archive(&archive_path);
        }

        result
    }

    /// Archives for a tenant, newest first.
    pub fn list_archives(&self, tenant: Uuid) -> ArchiveResult<Vec<ArchiveMeta>> {
        let index = ArchiveIndex::read(&self.layout.archive_index_file(tenant))?;
        Ok(index.sorted_desc())
    }

    /// Descriptor of one archive.
    pub fn get_meta(&self, tenant: Uuid, archive_id: &str) -> ArchiveResult<ArchiveMeta> {
        let index = ArchiveIndex::read(&self.layout.archive_index_file(tenant))?;
        index
            .get(archive_id)
            .cloned()
            .ok_or_else(|| ArchiveError::not_found(archive_id))
    }

    /// Update title/description. `None` leaves a field unchanged; the
    /// payload is never touched.
    pub fn set_meta(
        &self,
        tenant: Uuid,
        archive_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> ArchiveResult<ArchiveMeta> {
        self.with_index(tenant, |index| {
            let entry = index
                .get_mut(archive_id)
                .ok_or_else(|| ArchiveError::not_found(archive_id))?;

            if let Some(title) = title {
                entry.title = Some(title);
            }
            if let Some(description) = description {
                entry.description = Some(description);
            }

            Ok(entry.clone())
        })
    }

    /// Copy an existing local payload to remote storage. Idempotent: an
    /// archive already remote is a success without re-upload.
    ///
    /// # Errors
    ///
    /// `UV_ARCHIVE_REMOTE` on failure; the local copy is untouched.
    pub fn upload_to_remote(&self, tenant: Uuid, archive_id: &str) -> ArchiveResult<ArchiveMeta> {
        let meta = self.get_meta(tenant, archive_id)?;

        if meta.remote && self.remote.exists(tenant, archive_id) {
            return Ok(meta);
        }

        if !meta.local {
            return Err(ArchiveError::write_failed(format!(
                "archive {} has no local payload to upload",
                archive_id
            )));
        }

        let local_path = self.layout.archive_file(tenant, archive_id);
        self.remote
            .put(tenant, archive_id, &local_path)
            .map_err(|e| {
                ArchiveError::remote_unavailable(
                    format!("upload of archive {} failed", archive_id),
                    e,
                )
            })?;

        self.with_index(tenant, |index| {
            let entry = index
                .get_mut(archive_id)
                .ok_or_else(|| ArchiveError::not_found(archive_id))?;
            entry.remote = true;
            Ok(entry.clone())
        })
    }

    /// Remove an archive's local payload, optionally its remote copy, and
    /// its index entry once present in neither location.
    ///
    /// Deleting an archive that exists in neither location is a no-op
    /// success (the stale entry is dropped).
    pub fn delete_archive(
        &self,
        tenant: Uuid,
        archive_id: &str,
        also_remote: bool,
    ) -> ArchiveResult<()> {
        let meta = self.get_meta(tenant, archive_id)?;

        if meta.local {
            let path = self.layout.archive_file(tenant, archive_id);
            if path.exists() {
                std::fs::remove_file(&path)
                    .map_err(|e| ArchiveError::io_error_at_path(&path, e))?;
            }
        }

        let mut remote_remains = meta.remote;
        if also_remote && meta.remote {
            self.remote.delete(tenant, archive_id).map_err(|e| {
                ArchiveError::remote_unavailable(
                    format!("remote delete of archive {} failed", archive_id),
                    e,
                )
            })?;
            remote_remains = false;
        }

        self.with_index(tenant, |index| {
            if remote_remains {
                if let Some(entry) = index.get_mut(archive_id) {
                    entry.local = false;
                }
            } else {
                index.remove(archive_id);
            }
            Ok(())
        })
    }

    /// Verify the local payload exists and matches its recorded checksum.
    pub fn verify_payload(&self, tenant: Uuid, archive_id: &str) -> ArchiveResult<PathBuf> {
        let meta = self.get_meta(tenant, archive_id)?;
        let path = self.layout.archive_file(tenant, archive_id);

        if !meta.local || !path.exists() {
            return Err(ArchiveError::not_found(archive_id));
        }

        let actual = compute_file_checksum(&path)?;
        if actual != meta.checksum {
            return Err(ArchiveError::checksum_mismatch(
                archive_id,
                &meta.checksum,
                &actual,
            ));
        }

        Ok(path)
    }

    /// Remove all archives for a tenant (tenant deletion). Remote copies
    /// are removed best-effort.
    pub fn delete_all(&self, tenant: Uuid) -> ArchiveResult<()> {
        let index = ArchiveIndex::read(&self.layout.archive_index_file(tenant))?;
        for meta in &index.archives {
            if meta.remote {
                let _ = self.remote.delete(tenant, &meta.archive_id);
            }
        }

        let dir = self.layout.archives_dir(tenant);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .map_err(|e| ArchiveError::io_error_at_path(&dir, e))?;
        }
        Ok(())
    }

    /// The lock guarding one tenant's index file.
    fn index_guard(&self, tenant: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .index_locks
            .lock()
            .expect("archive index lock table poisoned");
        locks.entry(tenant).or_default().clone()
    }

    fn with_index<T>(
        &self,
        tenant: Uuid,
        f: impl FnOnce(&mut ArchiveIndex) -> ArchiveResult<T>,
    ) -> ArchiveResult<T> {
        let guard = self.index_guard(tenant);
        let _serial = guard.lock().expect("archive index lock poisoned");

        let path = self.layout.archive_index_file(tenant);
        let mut index = ArchiveIndex::read(&path)?;
        let value = f(&mut index)?;
        index.write(&path)?;
        Ok(value)
    }
}
