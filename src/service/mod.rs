//! Lifecycle service
//!
//! Single entry point over the registry, archive store, restore engine,
//! promotion controller, and reconciliation engine. Owns the per-tenant
//! operation locks: every mutating operation acquires the tenant's lock
//! fail-fast and holds it for the full duration, so two mutations on one
//! tenant never interleave while different tenants proceed independently.
//!
//! Every operation emits one structured log event on completion or failure.

mod errors;

pub use errors::{ServiceError, ServiceResult};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::archive::{ArchiveMeta, ArchiveStore, DirRemoteStore};
use crate::config::ServerConfig;
use crate::entity::{EntityCollection, EntityType};
use crate::observability::Logger;
use crate::promotion::{PromotionController, PromotionOutcome};
use crate::reconcile::{
    apply_collection, export_collection, reconcile_schemas, ExportBundle, ReconcileReport,
    TransferStrategy,
};
use crate::registry::{SchemaEntry, SchemaRegistry, TenantEntry, TenantState};
use crate::restore::{RestoreEngine, RestoreOutcome};
use crate::schema::{entity_counts, init_schema_dir, SchemaKind};
use crate::tenant::{DataLayout, Tenant, TenantLockGuard, TenantLocks};

/// One tenant in a listing.
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub state: TenantState,
}

/// Full lifecycle status of one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct TenantStatus {
    pub id: Uuid,
    pub name: String,
    pub state: TenantState,
    pub prod: SchemaEntry,
    pub temp: Option<SchemaEntry>,
}

pub struct LifecycleService {
    layout: DataLayout,
    registry: Arc<SchemaRegistry>,
    archives: Arc<ArchiveStore>,
    restore_engine: RestoreEngine,
    promotion: PromotionController,
    locks: TenantLocks,
}

impl LifecycleService {
    /// Open the service over a data directory, creating it if needed.
    pub fn open(config: &ServerConfig) -> ServiceResult<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| ServiceError::DataDir(config.data_dir.clone(), e))?;

        let layout = DataLayout::new(&config.data_dir);
        let registry = Arc::new(SchemaRegistry::open(layout.registry_file())?);
        let archives = Arc::new(ArchiveStore::new(
            layout.clone(),
            Box::new(DirRemoteStore::new(config.remote_root())),
        ));

        let restore_engine =
            RestoreEngine::new(layout.clone(), archives.clone(), registry.clone());
        let promotion =
            PromotionController::new(layout.clone(), archives.clone(), registry.clone());

        Ok(Self {
            layout,
            registry,
            archives,
            restore_engine,
            promotion,
            locks: TenantLocks::new(),
        })
    }

    fn lock(&self, tenant: Uuid) -> ServiceResult<TenantLockGuard<'_>> {
        self.locks
            .try_acquire(tenant)
            .ok_or(ServiceError::TargetBusy(tenant))
    }

    fn schema_entry(&self, tenant: Uuid, kind: SchemaKind) -> ServiceResult<SchemaEntry> {
        let entry = self.registry.get(tenant)?;
        match entry.entry(kind) {
            Some(schema) if schema.valid => Ok(schema.clone()),
            Some(_) => Err(ServiceError::SchemaInvalid { tenant, kind }),
            None => Err(ServiceError::Registry(
                crate::registry::RegistryError::NoTempSchema(tenant),
            )),
        }
    }

    // --- tenants ---

    pub fn create_tenant(&self, name: &str) -> ServiceResult<Tenant> {
        let tenant = Tenant::new(name);

        init_schema_dir(
            &self.layout.schema_dir(tenant.id, SchemaKind::Production),
            SchemaKind::Production,
            None,
        )?;
        self.registry
            .create_tenant(&tenant, SchemaEntry::fresh(Utc::now().to_rfc3339()))?;

        let id = tenant.id.to_string();
        Logger::info("tenant_created", &[("tenant", &id), ("name", name)]);
        Ok(tenant)
    }

    pub fn delete_tenant(&self, tenant: Uuid) -> ServiceResult<()> {
        let _lock = self.lock(tenant)?;
        self.registry.get(tenant)?;

        self.archives.delete_all(tenant)?;

        let dir = self.layout.tenant_dir(tenant);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| ServiceError::DataDir(dir, e))?;
        }

        self.registry.remove_tenant(tenant)?;

        let id = tenant.to_string();
        Logger::info("tenant_deleted", &[("tenant", &id)]);
        Ok(())
    }

    pub fn list_tenants(&self) -> Vec<TenantSummary> {
        self.registry
            .list()
            .into_iter()
            .map(|(id, entry)| TenantSummary {
                id,
                name: entry.name.clone(),
                state: entry.state(),
            })
            .collect()
    }

    pub fn tenant_status(&self, tenant: Uuid) -> ServiceResult<TenantStatus> {
        let entry: TenantEntry = self.registry.get(tenant)?;
        Ok(TenantStatus {
            id: tenant,
            name: entry.name.clone(),
            state: entry.state(),
            prod: entry.prod,
            temp: entry.temp,
        })
    }

    // --- archives ---

    pub fn create_backup(&self, tenant: Uuid, kind: SchemaKind) -> ServiceResult<ArchiveMeta> {
        let _lock = self.lock(tenant)?;
        self.schema_entry(tenant, kind)?;

        let id = tenant.to_string();
        match self.archives.create_archive(tenant, kind) {
            Ok(meta) => {
                Logger::info(
                    "backup_created",
                    &[
                        ("tenant", &id),
                        ("archive", &meta.archive_id),
                        ("schema", kind.as_str()),
                    ],
                );
                Ok(meta)
            }
            Err(e) => {
                let reason = e.to_string();
                Logger::error("backup_failed", &[("tenant", &id), ("reason", &reason)]);
                Err(e.into())
            }
        }
    }

    pub fn list_backups(&self, tenant: Uuid) -> ServiceResult<Vec<ArchiveMeta>> {
        self.registry.get(tenant)?;
        Ok(self.archives.list_archives(tenant)?)
    }

    pub fn get_backup(&self, tenant: Uuid, archive_id: &str) -> ServiceResult<ArchiveMeta> {
        self.registry.get(tenant)?;
        Ok(self.archives.get_meta(tenant, archive_id)?)
    }

    pub fn set_backup_meta(
        &self,
        tenant: Uuid,
        archive_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> ServiceResult<ArchiveMeta> {
        self.registry.get(tenant)?;
        Ok(self.archives.set_meta(tenant, archive_id, title, description)?)
    }

    pub fn upload_backup(&self, tenant: Uuid, archive_id: &str) -> ServiceResult<ArchiveMeta> {
        self.registry.get(tenant)?;

        let meta = self.archives.upload_to_remote(tenant, archive_id)?;
        let id = tenant.to_string();
        Logger::info(
            "backup_uploaded",
            &[("tenant", &id), ("archive", archive_id)],
        );
        Ok(meta)
    }

    pub fn delete_backup(
        &self,
        tenant: Uuid,
        archive_id: &str,
        also_remote: bool,
    ) -> ServiceResult<()> {
        self.registry.get(tenant)?;

        self.archives.delete_archive(tenant, archive_id, also_remote)?;
        let id = tenant.to_string();
        Logger::info(
            "backup_deleted",
            &[("tenant", &id), ("archive", archive_id)],
        );
        Ok(())
    }

    // --- restore / promotion ---

    pub fn restore(
        &self,
        tenant: Uuid,
        archive_id: &str,
        to_temp: bool,
    ) -> ServiceResult<RestoreOutcome> {
        let lock = self.lock(tenant)?;
        let target = SchemaKind::from_temp_flag(to_temp);

        let id = tenant.to_string();
        match self.restore_engine.restore(tenant, archive_id, target, &lock) {
            Ok(outcome) => {
                Logger::info(
                    "restore_completed",
                    &[
                        ("tenant", &id),
                        ("archive", archive_id),
                        ("target", target.as_str()),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => {
                let reason = e.to_string();
                Logger::error(
                    "restore_failed",
                    &[
                        ("tenant", &id),
                        ("archive", archive_id),
                        ("reason", &reason),
                    ],
                );
                Err(e.into())
            }
        }
    }

    pub fn promote(&self, tenant: Uuid) -> ServiceResult<PromotionOutcome> {
        let lock = self.lock(tenant)?;

        let id = tenant.to_string();
        match self.promotion.promote(tenant, &lock) {
            Ok(outcome) => {
                Logger::info(
                    "temp_promoted",
                    &[
                        ("tenant", &id),
                        ("safety_archive", &outcome.safety_archive_id),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => {
                let reason = e.to_string();
                Logger::error("promotion_failed", &[("tenant", &id), ("reason", &reason)]);
                Err(e.into())
            }
        }
    }

    pub fn discard_temp(&self, tenant: Uuid) -> ServiceResult<()> {
        let lock = self.lock(tenant)?;
        self.promotion.discard_temp(tenant, &lock)?;

        let id = tenant.to_string();
        Logger::info("temp_discarded", &[("tenant", &id)]);
        Ok(())
    }

    // --- entities ---

    pub fn entity_counts(
        &self,
        tenant: Uuid,
        kind: SchemaKind,
    ) -> ServiceResult<BTreeMap<EntityType, usize>> {
        self.schema_entry(tenant, kind)?;
        Ok(entity_counts(&self.layout.schema_dir(tenant, kind))?)
    }

    pub fn export_entities(
        &self,
        tenant: Uuid,
        kind: SchemaKind,
        entity: EntityType,
    ) -> ServiceResult<ExportBundle> {
        self.schema_entry(tenant, kind)?;
        Ok(export_collection(
            &self.layout.schema_dir(tenant, kind),
            entity,
            kind,
        )?)
    }

    pub fn import_entities(
        &self,
        tenant: Uuid,
        kind: SchemaKind,
        collection: EntityCollection,
        strategy: TransferStrategy,
    ) -> ServiceResult<ReconcileReport> {
        let _lock = self.lock(tenant)?;
        self.schema_entry(tenant, kind)?;

        let entity = collection.entity_type();
        let report = apply_collection(
            &self.layout.schema_dir(tenant, kind),
            collection,
            strategy,
        )?;

        let id = tenant.to_string();
        let summary = report_summary(&report);
        Logger::info(
            "entities_imported",
            &[
                ("tenant", &id),
                ("entity", entity.as_str()),
                ("schema", kind.as_str()),
                ("strategy", strategy.as_str()),
                ("result", &summary),
            ],
        );
        Ok(report)
    }

    /// Reconcile between the live schemas without a swap, leaving both in
    /// place. `from_temp` picks the direction (temp into prod, or prod into
    /// temp); `entity` limits the run to one collection.
    pub fn reconcile(
        &self,
        tenant: Uuid,
        from_temp: bool,
        entity: Option<EntityType>,
        strategy: TransferStrategy,
    ) -> ServiceResult<ReconcileReport> {
        let _lock = self.lock(tenant)?;
        self.registry.require_temp(tenant)?;
        self.schema_entry(tenant, SchemaKind::Production)?;

        let (source, dest) = if from_temp {
            (SchemaKind::Temporary, SchemaKind::Production)
        } else {
            (SchemaKind::Production, SchemaKind::Temporary)
        };
        let source_dir = self.layout.schema_dir(tenant, source);
        let dest_dir = self.layout.schema_dir(tenant, dest);

        let report = match entity {
            Some(entity) => {
                let bundle = export_collection(&source_dir, entity, source)?;
                apply_collection(&dest_dir, bundle.collection, strategy)?
            }
            None => reconcile_schemas(&source_dir, &dest_dir, strategy)?,
        };

        let id = tenant.to_string();
        let summary = report_summary(&report);
        Logger::info(
            "schemas_reconciled",
            &[
                ("tenant", &id),
                ("source", source.as_str()),
                ("strategy", strategy.as_str()),
                ("result", &summary),
            ],
        );
        Ok(report)
    }
}

fn report_summary(report: &ReconcileReport) -> String {
    format!(
        "imported={} updated={} skipped={} errors={}",
        report.imported,
        report.updated,
        report.skipped,
        report.errors.len()
    )
}
