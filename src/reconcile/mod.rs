//! Reconciliation engine
//!
//! Moves entity rows between schemas (or from an uploaded payload into a
//! schema) by natural-key matching. Surrogate ids never cross schemas: an
//! imported row always gets a fresh id from the destination sequence, and
//! an overwritten row keeps the id it already had.
//!
//! Entity types are processed in parent-before-child order, so a parent
//! imported earlier in the same run satisfies its children's references.
//! A row whose parent is missing from the destination becomes a report
//! error; the batch continues.

mod errors;
mod report;
mod strategy;

pub use errors::{ReconcileError, ReconcileResult};
pub use report::{ReconcileReport, RowError};
pub use strategy::{TransferStrategy, UnknownStrategy};

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::entity::{
    Enrollment, EntityCollection, EntityRecord, EntityType, Faculty, FacultyProfessor,
    FacultyStudent, Lecture, LectureMaterial, Subject, SubjectProfessor,
};
use crate::schema::{natural_keys, with_entity_record, EntityTable, SchemaKind};

/// Wire envelope for exported entity collections.
///
/// The collection is flattened, so the payload carries `entity_type` and
/// `data` at the top level and round-trips through import unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub source_schema: SchemaKind,
    /// RFC3339 export time
    pub exported_at: String,
    pub count: usize,
    #[serde(flatten)]
    pub collection: EntityCollection,
}

/// Reconcile every entity collection of `source_dir` into `dest_dir`.
pub fn reconcile_schemas(
    source_dir: &Path,
    dest_dir: &Path,
    strategy: TransferStrategy,
) -> ReconcileResult<ReconcileReport> {
    if !source_dir.is_dir() {
        return Err(ReconcileError::SourceMissing(source_dir.to_path_buf()));
    }

    let mut report = ReconcileReport::default();
    let mut parent_keys: BTreeMap<EntityType, HashSet<String>> = BTreeMap::new();

    // Parent-before-child order: keys recorded after each entity include
    // rows imported in this run, so children can reference them
    for entity in EntityType::ALL {
        with_entity_record!(entity, R => {
            let source = EntityTable::<R>::load(source_dir)?;
            let mut dest = EntityTable::<R>::load(dest_dir)?;

            reconcile_rows(&mut dest, source.rows, strategy, &parent_keys, &mut report);
            dest.save(dest_dir)?;

            let keys = dest.rows.iter().map(|r| r.natural_key()).collect();
            parent_keys.insert(entity, keys);
        });
    }

    Ok(report)
}

/// Reconcile one uploaded collection into a schema directory.
pub fn apply_collection(
    dest_dir: &Path,
    collection: EntityCollection,
    strategy: TransferStrategy,
) -> ReconcileResult<ReconcileReport> {
    let entity = collection.entity_type();

    let mut parent_keys: BTreeMap<EntityType, HashSet<String>> = BTreeMap::new();
    for parent in entity.parents() {
        parent_keys.insert(*parent, natural_keys(dest_dir, *parent)?);
    }

    let mut report = ReconcileReport::default();
    match collection {
        EntityCollection::Faculties(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::FacultyProfessors(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::FacultyStudents(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::Subjects(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::SubjectProfessors(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::Lectures(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::LectureMaterials(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
        EntityCollection::Enrollments(rows) => {
            apply_rows(dest_dir, rows, strategy, &parent_keys, &mut report)?
        }
    }

    Ok(report)
}

/// Export one entity collection from a schema directory.
pub fn export_collection(
    schema_dir: &Path,
    entity: EntityType,
    source_schema: SchemaKind,
) -> ReconcileResult<ExportBundle> {
    if !schema_dir.is_dir() {
        return Err(ReconcileError::SourceMissing(schema_dir.to_path_buf()));
    }

    let collection = match entity {
        EntityType::Faculties => {
            EntityCollection::Faculties(EntityTable::<Faculty>::load(schema_dir)?.rows)
        }
        EntityType::FacultyProfessors => EntityCollection::FacultyProfessors(
            EntityTable::<FacultyProfessor>::load(schema_dir)?.rows,
        ),
        EntityType::FacultyStudents => {
            EntityCollection::FacultyStudents(EntityTable::<FacultyStudent>::load(schema_dir)?.rows)
        }
        EntityType::Subjects => {
            EntityCollection::Subjects(EntityTable::<Subject>::load(schema_dir)?.rows)
        }
        EntityType::SubjectProfessors => EntityCollection::SubjectProfessors(
            EntityTable::<SubjectProfessor>::load(schema_dir)?.rows,
        ),
        EntityType::Lectures => {
            EntityCollection::Lectures(EntityTable::<Lecture>::load(schema_dir)?.rows)
        }
        EntityType::LectureMaterials => EntityCollection::LectureMaterials(
            EntityTable::<LectureMaterial>::load(schema_dir)?.rows,
        ),
        EntityType::Enrollments => {
            EntityCollection::Enrollments(EntityTable::<Enrollment>::load(schema_dir)?.rows)
        }
    };

    Ok(ExportBundle {
        source_schema,
        exported_at: Utc::now().to_rfc3339(),
        count: collection.len(),
        collection,
    })
}

fn apply_rows<R: EntityRecord>(
    dest_dir: &Path,
    rows: Vec<R>,
    strategy: TransferStrategy,
    parent_keys: &BTreeMap<EntityType, HashSet<String>>,
    report: &mut ReconcileReport,
) -> ReconcileResult<()> {
    let mut dest = EntityTable::<R>::load(dest_dir)?;
    reconcile_rows(&mut dest, rows, strategy, parent_keys, report);
    dest.save(dest_dir)?;
    Ok(())
}

/// Reconcile source rows into one destination table.
///
/// Destination-only rows are never touched by any strategy.
fn reconcile_rows<R: EntityRecord>(
    dest: &mut EntityTable<R>,
    source_rows: Vec<R>,
    strategy: TransferStrategy,
    parent_keys: &BTreeMap<EntityType, HashSet<String>>,
    report: &mut ReconcileReport,
) {
    let mut index = dest.natural_key_index();

    'rows: for row in source_rows {
        let key = row.natural_key();

        for parent in row.parent_refs() {
            let present = parent_keys
                .get(&parent.entity)
                .map_or(false, |keys| keys.contains(&parent.natural_key));
            if !present {
                report.row_error(
                    R::ENTITY,
                    key.clone(),
                    format!("missing parent {} '{}'", parent.entity, parent.natural_key),
                );
                continue 'rows;
            }
        }

        match index.get(&key).copied() {
            Some(pos) => match strategy {
                TransferStrategy::Replace => {
                    overwrite_row(dest, pos, row);
                    report.updated += 1;
                }
                TransferStrategy::Merge => {
                    if dest.rows[pos].content_eq(&row) {
                        report.skipped += 1;
                    } else {
                        overwrite_row(dest, pos, row);
                        report.updated += 1;
                    }
                }
                TransferStrategy::SkipExisting => {
                    report.skipped += 1;
                }
            },
            None => {
                dest.insert(row);
                index.insert(key, dest.rows.len() - 1);
                report.imported += 1;
            }
        }
    }
}

/// Overwrite a destination row's payload, keeping its surrogate id.
fn overwrite_row<R: EntityRecord>(dest: &mut EntityTable<R>, pos: usize, mut row: R) {
    let id = dest.rows[pos].id();
    row.set_id(id);
    dest.rows[pos] = row;
}
