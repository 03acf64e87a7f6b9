//! Typed entity tables
//!
//! Each entity type is stored as one JSON file per schema directory:
//! `{entity_type, next_id, rows}`. `next_id` is the schema-local surrogate
//! sequence; ids are never reused and never compared across schemas.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityRecord, EntityType};

use super::{fsops, SchemaError, SchemaResult};

/// Dispatch a generic body over the concrete record type of an entity.
macro_rules! with_entity_record {
    ($entity:expr, $R:ident => $body:expr) => {
        match $entity {
            $crate::entity::EntityType::Faculties => {
                type $R = $crate::entity::Faculty;
                $body
            }
            $crate::entity::EntityType::FacultyProfessors => {
                type $R = $crate::entity::FacultyProfessor;
                $body
            }
            $crate::entity::EntityType::FacultyStudents => {
                type $R = $crate::entity::FacultyStudent;
                $body
            }
            $crate::entity::EntityType::Subjects => {
                type $R = $crate::entity::Subject;
                $body
            }
            $crate::entity::EntityType::SubjectProfessors => {
                type $R = $crate::entity::SubjectProfessor;
                $body
            }
            $crate::entity::EntityType::Lectures => {
                type $R = $crate::entity::Lecture;
                $body
            }
            $crate::entity::EntityType::LectureMaterials => {
                type $R = $crate::entity::LectureMaterial;
                $body
            }
            $crate::entity::EntityType::Enrollments => {
                type $R = $crate::entity::Enrollment;
                $body
            }
        }
    };
}
pub(crate) use with_entity_record;

/// One entity collection within a schema directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTable<R> {
    pub entity_type: EntityType,
    pub next_id: u64,
    pub rows: Vec<R>,
}

impl<R: EntityRecord> EntityTable<R> {
    /// An empty table with the sequence at 1.
    pub fn empty() -> Self {
        Self {
            entity_type: R::ENTITY,
            next_id: 1,
            rows: Vec::new(),
        }
    }

    /// Load the table from a schema directory. A missing file is an empty
    /// table; a file that fails to parse or carries the wrong tag is an
    /// error.
    pub fn load(schema_dir: &Path) -> SchemaResult<Self> {
        let path = schema_dir.join(R::ENTITY.file_name());
        if !path.exists() {
            return Ok(Self::empty());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| SchemaError::io(&path, e))?;
        let table: Self = serde_json::from_str(&contents).map_err(|e| SchemaError::Table {
            entity: R::ENTITY,
            reason: e.to_string(),
        })?;

        if table.entity_type != R::ENTITY {
            return Err(SchemaError::Table {
                entity: R::ENTITY,
                reason: format!("file is tagged {}", table.entity_type),
            });
        }

        Ok(table)
    }

    /// Persist the table into a schema directory (atomic write).
    pub fn save(&self, schema_dir: &Path) -> SchemaResult<()> {
        let path = schema_dir.join(R::ENTITY.file_name());
        let json = serde_json::to_string_pretty(self).map_err(|e| SchemaError::Table {
            entity: R::ENTITY,
            reason: e.to_string(),
        })?;
        fsops::write_atomic(&path, json.as_bytes()).map_err(|e| SchemaError::io(&path, e))
    }

    /// Insert a row under a fresh surrogate id; returns the assigned id.
    pub fn insert(&mut self, mut row: R) -> u64 {
        let id = self.next_id;
        row.set_id(id);
        self.next_id += 1;
        self.rows.push(row);
        id
    }

    /// Index of natural key -> position in `rows`.
    pub fn natural_key_index(&self) -> HashMap<String, usize> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.natural_key(), i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Write an empty table for an entity type.
pub(crate) fn write_empty_table(schema_dir: &Path, entity: EntityType) -> SchemaResult<()> {
    with_entity_record!(entity, R => EntityTable::<R>::empty().save(schema_dir))
}

/// Parse every entity table in a schema directory into its typed form.
pub fn validate_tables(schema_dir: &Path) -> SchemaResult<()> {
    for entity in EntityType::ALL {
        with_entity_record!(entity, R => {
            EntityTable::<R>::load(schema_dir)?;
        });
    }
    Ok(())
}

/// Row counts per entity type, for transfer-planning callers.
pub fn entity_counts(schema_dir: &Path) -> SchemaResult<BTreeMap<EntityType, usize>> {
    let mut counts = BTreeMap::new();
    for entity in EntityType::ALL {
        let count = with_entity_record!(entity, R => EntityTable::<R>::load(schema_dir)?.len());
        counts.insert(entity, count);
    }
    Ok(counts)
}

/// Natural keys present for one entity type in a schema directory.
pub fn natural_keys(schema_dir: &Path, entity: EntityType) -> SchemaResult<HashSet<String>> {
    with_entity_record!(entity, R => {
        let table = EntityTable::<R>::load(schema_dir)?;
        Ok(table.rows.iter().map(|r| r.natural_key()).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Faculty;
    use tempfile::TempDir;

    fn faculty(code: &str) -> Faculty {
        Faculty {
            id: 0,
            code: code.to_string(),
            name: format!("Faculty {}", code),
            description: None,
        }
    }

    #[test]
    fn test_empty_table_sequence_starts_at_one() {
        let table = EntityTable::<Faculty>::empty();
        assert_eq!(table.next_id, 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut table = EntityTable::<Faculty>::empty();

        let first = table.insert(faculty("FIT"));
        let second = table.insert(faculty("FON"));

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(table.next_id, 3);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();

        let mut table = EntityTable::<Faculty>::empty();
        table.insert(faculty("FIT"));
        table.save(dir.path()).unwrap();

        let loaded = EntityTable::<Faculty>::load(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.next_id, 2);
        assert_eq!(loaded.rows[0].code, "FIT");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let table = EntityTable::<Faculty>::load(dir.path()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_rejects_wrong_tag() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("faculties.json"),
            r#"{"entity_type":"subjects","next_id":1,"rows":[]}"#,
        )
        .unwrap();

        let result = EntityTable::<Faculty>::load(dir.path());
        assert!(matches!(result, Err(SchemaError::Table { .. })));
    }

    #[test]
    fn test_entity_counts_covers_all_types() {
        let dir = TempDir::new().unwrap();

        let mut table = EntityTable::<Faculty>::empty();
        table.insert(faculty("FIT"));
        table.save(dir.path()).unwrap();

        let counts = entity_counts(dir.path()).unwrap();
        assert_eq!(counts.len(), EntityType::ALL.len());
        assert_eq!(counts[&EntityType::Faculties], 1);
        assert_eq!(counts[&EntityType::Subjects], 0);
    }

    #[test]
    fn test_natural_keys() {
        let dir = TempDir::new().unwrap();

        let mut table = EntityTable::<Faculty>::empty();
        table.insert(faculty("FIT"));
        table.insert(faculty("FON"));
        table.save(dir.path()).unwrap();

        let keys = natural_keys(dir.path(), EntityType::Faculties).unwrap();
        assert!(keys.contains("FIT"));
        assert!(keys.contains("FON"));
        assert_eq!(keys.len(), 2);
    }
}
