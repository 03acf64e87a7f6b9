//! Reconciliation reports
//!
//! Every reconciliation returns exact counts plus per-row errors. A row
//! error never aborts the batch; the remaining rows are still processed.

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// One row that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub entity: EntityType,
    pub natural_key: String,
    pub reason: String,
}

/// Outcome counts of one reconciliation.
///
/// - `imported`: rows with no natural-key match, inserted under a fresh id
/// - `updated`: rows whose match was overwritten
/// - `skipped`: rows whose match was left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub imported: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: Vec<RowError>,
}

impl ReconcileReport {
    /// Rows accounted for, errors included.
    pub fn total(&self) -> u64 {
        self.imported + self.updated + self.skipped + self.errors.len() as u64
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn row_error(
        &mut self,
        entity: EntityType,
        natural_key: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.errors.push(RowError {
            entity,
            natural_key: natural_key.into(),
            reason: reason.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_includes_errors() {
        let mut report = ReconcileReport {
            imported: 2,
            updated: 1,
            skipped: 3,
            errors: Vec::new(),
        };
        report.row_error(EntityType::Subjects, "FIT::CS101", "missing parent");

        assert_eq!(report.total(), 7);
        assert!(!report.is_clean());
    }
}
