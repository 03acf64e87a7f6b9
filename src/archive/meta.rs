//! Archive metadata and the per-tenant index
//!
//! The payload of an archive is immutable; the metadata is not. Title and
//! description are free text, absent from a fresh snapshot until explicitly
//! set, and editable at any time without touching the payload.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{fsync_dir, SchemaKind};

use super::errors::{ArchiveError, ArchiveResult};

/// Descriptor of one backup archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMeta {
    pub archive_id: String,
    pub tenant_id: Uuid,
    /// Schema kind the snapshot was taken from
    pub schema_kind: SchemaKind,
    /// RFC3339 creation time
    pub created_at: String,
    pub size_bytes: u64,
    /// CRC32 of the tar payload, `crc32:xxxxxxxx`
    pub checksum: String,
    /// Present in local archive storage
    pub local: bool,
    /// Present in the remote store
    pub remote: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The per-tenant archive index file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub archives: Vec<ArchiveMeta>,
}

impl ArchiveIndex {
    /// Read the index; a missing file is an empty index.
    pub fn read(path: &Path) -> ArchiveResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ArchiveError::io_error_at_path(path, e))?;
        serde_json::from_str(&contents).map_err(|e| {
            ArchiveError::write_failed(format!(
                "corrupt archive index {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Persist the index atomically: temp sibling, fsync, rename.
    pub fn write(&self, path: &Path) -> ArchiveResult<()> {
        let parent = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io_error_at_path(parent, e))?;

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ArchiveError::write_failed(format!("serialize index: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes())
            .map_err(|e| ArchiveError::io_error_at_path(&tmp, e))?;
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(&tmp)
            .map_err(|e| ArchiveError::io_error_at_path(&tmp, e))?;
        file.sync_all()
            .map_err(|e| ArchiveError::io_error_at_path(&tmp, e))?;

        std::fs::rename(&tmp, path).map_err(|e| ArchiveError::io_error_at_path(path, e))?;
        fsync_dir(parent).map_err(|e| ArchiveError::io_error_at_path(parent, e))
    }

    /// Find an entry by archive id.
    pub fn get(&self, archive_id: &str) -> Option<&ArchiveMeta> {
        self.archives.iter().find(|a| a.archive_id == archive_id)
    }

    pub fn get_mut(&mut self, archive_id: &str) -> Option<&mut ArchiveMeta> {
        self.archives.iter_mut().find(|a| a.archive_id == archive_id)
    }

    /// Remove an entry; returns whether it existed.
    pub fn remove(&mut self, archive_id: &str) -> bool {
        let before = self.archives.len();
        self.archives.retain(|a| a.archive_id != archive_id);
        self.archives.len() != before
    }

    /// Entries ordered by creation time descending.
    pub fn sorted_desc(&self) -> Vec<ArchiveMeta> {
        let mut list = self.archives.clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}
