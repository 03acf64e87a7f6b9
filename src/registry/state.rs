//! Tenant registry entries and schema state
//!
//! Each tenant has exactly one production schema and at most one temporary
//! schema. The registry records which schemas exist, whether each is in a
//! consistent state, and the archive each was last restored from.

use serde::{Deserialize, Serialize};

use crate::schema::SchemaKind;

/// Lifecycle state of one tenant's schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantState {
    /// Only the production schema exists
    ProdOnly,
    /// A temporary schema exists alongside production
    ProdPlusTemp,
}

/// Registry record for one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// RFC3339 creation time
    pub created_at: String,
    /// Archive id this schema was last restored from, if any
    #[serde(default)]
    pub restored_from: Option<String>,
    /// False only inside a restore window; an invalid schema must not be
    /// served or promoted
    pub valid: bool,
}

impl SchemaEntry {
    pub fn fresh(created_at: impl Into<String>) -> Self {
        Self {
            created_at: created_at.into(),
            restored_from: None,
            valid: true,
        }
    }

    pub fn restored(created_at: impl Into<String>, archive_id: impl Into<String>) -> Self {
        Self {
            created_at: created_at.into(),
            restored_from: Some(archive_id.into()),
            valid: true,
        }
    }
}

/// Registry record for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantEntry {
    pub name: String,
    pub prod: SchemaEntry,
    #[serde(default)]
    pub temp: Option<SchemaEntry>,
}

impl TenantEntry {
    pub fn state(&self) -> TenantState {
        if self.temp.is_some() {
            TenantState::ProdPlusTemp
        } else {
            TenantState::ProdOnly
        }
    }

    pub fn entry(&self, kind: SchemaKind) -> Option<&SchemaEntry> {
        match kind {
            SchemaKind::Production => Some(&self.prod),
            SchemaKind::Temporary => self.temp.as_ref(),
        }
    }

    pub fn entry_mut(&mut self, kind: SchemaKind) -> Option<&mut SchemaEntry> {
        match kind {
            SchemaKind::Production => Some(&mut self.prod),
            SchemaKind::Temporary => self.temp.as_mut(),
        }
    }
}
