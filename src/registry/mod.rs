//! Schema registry
//!
//! Authoritative record of which tenants exist and which schemas each one
//! has. Backed by a single JSON file, loaded on startup and rewritten
//! atomically after every mutation, so a crash never leaves a half-written
//! registry.
//!
//! - Every tenant has exactly one production entry
//! - A temporary entry exists only between restore-to-temp and the
//!   following promotion or discard
//! - A schema is marked invalid for the duration of a restore's
//!   destructive window and revalidated afterwards

mod errors;
mod state;

pub use errors::{RegistryError, RegistryResult};
pub use state::{SchemaEntry, TenantEntry, TenantState};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{write_atomic, SchemaKind};
use crate::tenant::Tenant;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    tenants: BTreeMap<Uuid, TenantEntry>,
}

/// In-memory view of the registry plus its persistent file.
pub struct SchemaRegistry {
    path: PathBuf,
    tenants: RwLock<BTreeMap<Uuid, TenantEntry>>,
}

impl SchemaRegistry {
    /// Load the registry from disk; a missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();

        let tenants = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| RegistryError::io(&path, e))?;
            let file: RegistryFile =
                serde_json::from_str(&contents).map_err(|e| RegistryError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            file.tenants
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            tenants: RwLock::new(tenants),
        })
    }

    fn persist(&self, tenants: &BTreeMap<Uuid, TenantEntry>) -> RegistryResult<()> {
        let file = RegistryFile {
            tenants: tenants.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| RegistryError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }
        write_atomic(&self.path, json.as_bytes()).map_err(|e| RegistryError::io(&self.path, e))
    }

    /// Register a new tenant with a fresh production entry.
    pub fn create_tenant(&self, tenant: &Tenant, prod: SchemaEntry) -> RegistryResult<()> {
        let mut tenants = self.tenants.write().expect("registry lock poisoned");
        if tenants.contains_key(&tenant.id) {
            return Err(RegistryError::TenantExists(tenant.id));
        }
        tenants.insert(
            tenant.id,
            TenantEntry {
                name: tenant.name.clone(),
                prod,
                temp: None,
            },
        );
        self.persist(&tenants)
    }

    /// Remove a tenant entirely.
    pub fn remove_tenant(&self, tenant: Uuid) -> RegistryResult<()> {
        let mut tenants = self.tenants.write().expect("registry lock poisoned");
        if tenants.remove(&tenant).is_none() {
            return Err(RegistryError::UnknownTenant(tenant));
        }
        self.persist(&tenants)
    }

    /// Snapshot of one tenant's entry.
    pub fn get(&self, tenant: Uuid) -> RegistryResult<TenantEntry> {
        let tenants = self.tenants.read().expect("registry lock poisoned");
        tenants
            .get(&tenant)
            .cloned()
            .ok_or(RegistryError::UnknownTenant(tenant))
    }

    /// All tenants, ordered by id.
    pub fn list(&self) -> Vec<(Uuid, TenantEntry)> {
        let tenants = self.tenants.read().expect("registry lock poisoned");
        tenants.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    pub fn contains(&self, tenant: Uuid) -> bool {
        self.tenants
            .read()
            .expect("registry lock poisoned")
            .contains_key(&tenant)
    }

    /// Fail unless the tenant currently has a temporary schema.
    pub fn require_temp(&self, tenant: Uuid) -> RegistryResult<SchemaEntry> {
        let entry = self.get(tenant)?;
        entry.temp.ok_or(RegistryError::NoTempSchema(tenant))
    }

    /// Mutate one tenant's entry and persist.
    pub fn update<T>(
        &self,
        tenant: Uuid,
        f: impl FnOnce(&mut TenantEntry) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let mut tenants = self.tenants.write().expect("registry lock poisoned");
        let entry = tenants
            .get_mut(&tenant)
            .ok_or(RegistryError::UnknownTenant(tenant))?;
        let value = f(entry)?;
        self.persist(&tenants)?;
        Ok(value)
    }

    /// Replace a schema entry wholesale (end of a successful restore).
    pub fn set_entry(
        &self,
        tenant: Uuid,
        kind: SchemaKind,
        schema: SchemaEntry,
    ) -> RegistryResult<()> {
        self.update(tenant, |entry| {
            match kind {
                SchemaKind::Production => entry.prod = schema,
                SchemaKind::Temporary => entry.temp = Some(schema),
            }
            Ok(())
        })
    }

    /// Drop the temporary entry (promotion or discard).
    pub fn clear_temp(&self, tenant: Uuid) -> RegistryResult<()> {
        self.update(tenant, |entry| {
            if entry.temp.take().is_none() {
                return Err(RegistryError::NoTempSchema(tenant));
            }
            Ok(())
        })
    }

    /// Flip a schema's validity flag. Marking invalid opens a restore's
    /// destructive window; marking valid closes it.
    pub fn set_valid(&self, tenant: Uuid, kind: SchemaKind, valid: bool) -> RegistryResult<()> {
        self.update(tenant, |entry| {
            match entry.entry_mut(kind) {
                Some(schema) => schema.valid = valid,
                None => return Err(RegistryError::NoTempSchema(tenant)),
            }
            Ok(())
        })
    }
}
