//! Promotion controller
//!
//! Makes a tenant's temporary schema the production schema. The sequence
//! mirrors a production restore: safety backup first, then a rename swap,
//! so the pre-promotion production content always survives in an archive.
//!
//! - Precondition: the tenant has a temporary schema
//! - A swap failure leaves production untouched and the temporary schema
//!   retained for another attempt
//! - After a successful swap the temporary schema no longer exists

mod errors;

pub use errors::{PromotionError, PromotionResult};

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::archive::ArchiveStore;
use crate::registry::SchemaRegistry;
use crate::schema::{atomic_replace_dir, SchemaKind, SchemaManifest};
use crate::tenant::{DataLayout, TenantLockGuard};

/// Result of a completed promotion.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionOutcome {
    pub tenant_id: Uuid,
    /// Backup of the replaced production schema
    pub safety_archive_id: String,
    /// Archive the promoted schema was originally restored from, if any
    pub promoted_from: Option<String>,
}

pub struct PromotionController {
    layout: DataLayout,
    archives: Arc<ArchiveStore>,
    registry: Arc<SchemaRegistry>,
}

impl PromotionController {
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

    /// Promote the tenant's temporary schema to production.
    ///
    /// The caller holds the tenant's operation lock for the full duration.
    pub fn promote(
        &self,
        tenant: Uuid,
        _lock: &TenantLockGuard,
    ) -> PromotionResult<PromotionOutcome> {
        let temp_entry = self.registry.require_temp(tenant).map_err(|e| match e {
            crate::registry::RegistryError::NoTempSchema(t) => PromotionError::NoTempSchema(t),
            other => other.into(),
        })?;

        let temp_dir = self.layout.schema_dir(tenant, SchemaKind::Temporary);
        if !temp_dir.is_dir() {
            return Err(PromotionError::NoTempSchema(tenant));
        }

        let safety = self
            .archives
            .create_archive(tenant, SchemaKind::Production)
            .map_err(|source| PromotionError::SafetyBackupFailed { source })?;

        // Stamp the manifest before the swap so the promoted directory
        // already reads as production; reverted if the swap fails
        let manifest = SchemaManifest::read_from_dir(&temp_dir)
            .map_err(|e| PromotionError::SwapFailed(e.to_string()))?;
        SchemaManifest {
            kind: SchemaKind::Production,
            ..manifest.clone()
        }
        .write_to_dir(&temp_dir)
        .map_err(|e| PromotionError::SwapFailed(e.to_string()))?;

        let prod_dir = self.layout.schema_dir(tenant, SchemaKind::Production);
        if let Err(e) = atomic_replace_dir(&prod_dir, &temp_dir) {
            let _ = manifest.write_to_dir(&temp_dir);
            return Err(PromotionError::SwapFailed(e.to_string()));
        }

        self.registry.update(tenant, |entry| {
            entry.prod = temp_entry.clone();
            entry.temp = None;
            Ok(())
        })?;

        Ok(PromotionOutcome {
            tenant_id: tenant,
            safety_archive_id: safety.archive_id,
            promoted_from: temp_entry.restored_from,
        })
    }

    /// Discard the temporary schema without promoting it.
    pub fn discard_temp(&self, tenant: Uuid, _lock: &TenantLockGuard) -> PromotionResult<()> {
        self.registry.require_temp(tenant).map_err(|e| match e {
            crate::registry::RegistryError::NoTempSchema(t) => PromotionError::NoTempSchema(t),
            other => other.into(),
        })?;

        let temp_dir = self.layout.schema_dir(tenant, SchemaKind::Temporary);
        if temp_dir.exists() {
            std::fs::remove_dir_all(&temp_dir)
                .map_err(|e| PromotionError::SwapFailed(e.to_string()))?;
        }

        self.registry.clear_temp(tenant)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::DirRemoteStore;
    use crate::entity::Faculty;
    use crate::registry::{SchemaEntry, TenantState};
    use crate::schema::{init_schema_dir, EntityTable};
    use crate::tenant::{Tenant, TenantLocks};
    use chrono::Utc;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        layout: DataLayout,
        controller: PromotionController,
        archives: Arc<ArchiveStore>,
        registry: Arc<SchemaRegistry>,
        locks: TenantLocks,
        tenant: Uuid,
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        let archives = Arc::new(ArchiveStore::new(
            layout.clone(),
            Box::new(DirRemoteStore::new(dir.path().join("remote"))),
        ));
        let registry = Arc::new(SchemaRegistry::open(layout.registry_file()).unwrap());

        let tenant = Tenant::new("uni");
        init_schema_dir(
            &layout.schema_dir(tenant.id, SchemaKind::Production),
            SchemaKind::Production,
            None,
        )
        .unwrap();
        registry
            .create_tenant(&tenant, SchemaEntry::fresh(Utc::now().to_rfc3339()))
            .unwrap();

        let controller =
            PromotionController::new(layout.clone(), archives.clone(), registry.clone());

        Fixture {
            _dir: dir,
            layout,
            controller,
            archives,
            registry,
            locks: TenantLocks::default(),
            tenant: tenant.id,
        }
    }

    fn add_temp(f: &Fixture, restored_from: &str) {
        init_schema_dir(
            &f.layout.schema_dir(f.tenant, SchemaKind::Temporary),
            SchemaKind::Temporary,
            Some(restored_from.to_string()),
        )
        .unwrap();
        f.registry
            .set_entry(
                f.tenant,
                SchemaKind::Temporary,
                SchemaEntry::restored(Utc::now().to_rfc3339(), restored_from),
            )
            .unwrap();
    }

    fn write_faculty(schema_dir: &Path, code: &str) {
        let mut table = EntityTable::<Faculty>::empty();
        table.insert(Faculty {
            id: 0,
            code: code.to_string(),
            name: format!("Faculty {}", code),
            description: None,
        });
        table.save(schema_dir).unwrap();
    }

    fn faculty_codes(schema_dir: &Path) -> Vec<String> {
        EntityTable::<Faculty>::load(schema_dir)
            .unwrap()
            .rows
            .iter()
            .map(|f| f.code.clone())
            .collect()
    }

    #[test]
    fn test_promote_swaps_temp_into_production() {
        let f = setup();
        let prod = f.layout.schema_dir(f.tenant, SchemaKind::Production);
        let temp = f.layout.schema_dir(f.tenant, SchemaKind::Temporary);

        write_faculty(&prod, "OLD");
        add_temp(&f, "a1");
        write_faculty(&temp, "NEW");

        let lock = f.locks.try_acquire(f.tenant).unwrap();
        let outcome = f.controller.promote(f.tenant, &lock).unwrap();

        assert_eq!(faculty_codes(&prod), vec!["NEW"]);
        assert!(!temp.exists());
        assert_eq!(outcome.promoted_from.as_deref(), Some("a1"));

        let manifest = SchemaManifest::read_from_dir(&prod).unwrap();
        assert_eq!(manifest.kind, SchemaKind::Production);

        let entry = f.registry.get(f.tenant).unwrap();
        assert_eq!(entry.state(), TenantState::ProdOnly);
        assert_eq!(entry.prod.restored_from.as_deref(), Some("a1"));
    }

    #[test]
    fn test_promote_takes_safety_backup() {
        let f = setup();
        let prod = f.layout.schema_dir(f.tenant, SchemaKind::Production);

        write_faculty(&prod, "OLD");
        add_temp(&f, "a1");

        let lock = f.locks.try_acquire(f.tenant).unwrap();
        let outcome = f.controller.promote(f.tenant, &lock).unwrap();

        let safety = f
            .archives
            .get_meta(f.tenant, &outcome.safety_archive_id)
            .unwrap();
        assert_eq!(safety.schema_kind, SchemaKind::Production);
    }

    #[test]
    fn test_promote_without_temp() {
        let f = setup();

        let lock = f.locks.try_acquire(f.tenant).unwrap();
        let result = f.controller.promote(f.tenant, &lock);

        assert!(matches!(result, Err(PromotionError::NoTempSchema(_))));
    }

    #[test]
    fn test_promote_twice_fails_second_time() {
        let f = setup();
        add_temp(&f, "a1");

        let lock = f.locks.try_acquire(f.tenant).unwrap();
        f.controller.promote(f.tenant, &lock).unwrap();

        let result = f.controller.promote(f.tenant, &lock);
        assert!(matches!(result, Err(PromotionError::NoTempSchema(_))));
    }

    #[test]
    fn test_discard_temp() {
        let f = setup();
        let temp = f.layout.schema_dir(f.tenant, SchemaKind::Temporary);
        add_temp(&f, "a1");

        let lock = f.locks.try_acquire(f.tenant).unwrap();
        f.controller.discard_temp(f.tenant, &lock).unwrap();

        assert!(!temp.exists());
        assert_eq!(
            f.registry.get(f.tenant).unwrap().state(),
            TenantState::ProdOnly
        );
    }

    #[test]
    fn test_discard_without_temp() {
        let f = setup();

        let lock = f.locks.try_acquire(f.tenant).unwrap();
        let result = f.controller.discard_temp(f.tenant, &lock);

        assert!(matches!(result, Err(PromotionError::NoTempSchema(_))));
    }
}
