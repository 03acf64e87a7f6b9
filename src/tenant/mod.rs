//! Tenant identity, on-disk layout, and per-tenant operation locks
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/
//! ├── registry.json
//! ├── tenants/<tenant_id>/
//! │   ├── prod/            # production schema
//! │   └── temp/            # temporary schema (optional)
//! └── archives/<tenant_id>/
//!     ├── index.json
//!     └── <archive_id>.tar
//! ```

mod locks;

pub use locks::{TenantLockGuard, TenantLocks};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::SchemaKind;

/// One institution's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Resolves every on-disk location from the data directory root.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_file(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    pub fn tenant_dir(&self, tenant: Uuid) -> PathBuf {
        self.root.join("tenants").join(tenant.to_string())
    }

    pub fn schema_dir(&self, tenant: Uuid, kind: SchemaKind) -> PathBuf {
        self.tenant_dir(tenant).join(kind.dir_name())
    }

    pub fn archives_dir(&self, tenant: Uuid) -> PathBuf {
        self.root.join("archives").join(tenant.to_string())
    }

    pub fn archive_index_file(&self, tenant: Uuid) -> PathBuf {
        self.archives_dir(tenant).join("index.json")
    }

    pub fn archive_file(&self, tenant: Uuid, archive_id: &str) -> PathBuf {
        self.archives_dir(tenant).join(format!("{}.tar", archive_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = DataLayout::new("/data");
        let tenant = Uuid::nil();

        assert_eq!(layout.registry_file(), PathBuf::from("/data/registry.json"));
        assert!(layout
            .schema_dir(tenant, SchemaKind::Production)
            .ends_with(format!("{}/prod", tenant)));
        assert!(layout
            .schema_dir(tenant, SchemaKind::Temporary)
            .ends_with(format!("{}/temp", tenant)));
        assert!(layout
            .archive_file(tenant, "a1")
            .ends_with(format!("{}/a1.tar", tenant)));
    }
}
