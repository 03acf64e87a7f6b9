//! Remote archive storage
//!
//! The store only needs put/delete/exists over opaque tar payloads, so the
//! backend sits behind a small trait. The shipped backend is a mounted
//! directory (NFS, object-store gateway); uploads are copy + fsync so a
//! torn copy is never observed as complete.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Durable remote storage for archive payloads.
pub trait RemoteStore: Send + Sync {
    /// Copy a local archive payload into remote storage. Overwrites any
    /// existing copy (payloads are immutable, so this is a no-op rewrite).
    fn put(&self, tenant: Uuid, archive_id: &str, local_path: &Path) -> io::Result<()>;

    /// Remove a remote copy. Removing a missing copy is a success.
    fn delete(&self, tenant: Uuid, archive_id: &str) -> io::Result<()>;

    /// Whether a remote copy exists.
    fn exists(&self, tenant: Uuid, archive_id: &str) -> bool;
}

/// Directory-backed remote store.
#[derive(Debug, Clone)]
pub struct DirRemoteStore {
    root: PathBuf,
}

impl DirRemoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, tenant: Uuid, archive_id: &str) -> PathBuf {
        self.root
            .join(tenant.to_string())
            .join(format!("{}.tar", archive_id))
    }
}

impl RemoteStore for DirRemoteStore {
    fn put(&self, tenant: Uuid, archive_id: &str, local_path: &Path) -> io::Result<()> {
        let dest = self.object_path(tenant, archive_id);
        let parent = dest.parent().expect("object path has a parent");
        fs::create_dir_all(parent)?;

        let mut src = File::open(local_path)?;
        let mut contents = Vec::new();
        src.read_to_end(&mut contents)?;

        // Write to a temp sibling then rename so a torn copy is never
        // visible under the final name
        let tmp = dest.with_extension("tar.partial");
        {
            let mut out = File::create(&tmp)?;
            out.write_all(&contents)?;
            out.sync_all()?;
        }
        fs::rename(&tmp, &dest)?;

        Ok(())
    }

    fn delete(&self, tenant: Uuid, archive_id: &str) -> io::Result<()> {
        let path = self.object_path(tenant, archive_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, tenant: Uuid, archive_id: &str) -> bool {
        self.object_path(tenant, archive_id).exists()
    }
}
