//! Entity model for tenant schemas
//!
//! The entity set is closed: every schema holds exactly these collections,
//! each with a declared natural key and parent entity types. Reconciliation
//! matches rows by natural key, never by surrogate id - source and
//! destination id sequences are independent.

mod records;

pub use records::{
    Enrollment, Faculty, FacultyProfessor, FacultyStudent, Lecture, LectureMaterial, Subject,
    SubjectProfessor,
};

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The closed set of entity collections a schema holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Faculties,
    FacultyProfessors,
    FacultyStudents,
    Subjects,
    SubjectProfessors,
    Lectures,
    LectureMaterials,
    Enrollments,
}

impl EntityType {
    /// All entity types in parent-before-child order.
    pub const ALL: [EntityType; 8] = [
        EntityType::Faculties,
        EntityType::FacultyProfessors,
        EntityType::FacultyStudents,
        EntityType::Subjects,
        EntityType::SubjectProfessors,
        EntityType::Lectures,
        EntityType::LectureMaterials,
        EntityType::Enrollments,
    ];

    /// Returns the snake_case name used in table files and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Faculties => "faculties",
            EntityType::FacultyProfessors => "faculty_professors",
            EntityType::FacultyStudents => "faculty_students",
            EntityType::Subjects => "subjects",
            EntityType::SubjectProfessors => "subject_professors",
            EntityType::Lectures => "lectures",
            EntityType::LectureMaterials => "lecture_materials",
            EntityType::Enrollments => "enrollments",
        }
    }

    /// Table file name inside a schema directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    /// Parent entity types that must exist in a destination schema before
    /// rows of this type can be reconciled into it.
    pub fn parents(&self) -> &'static [EntityType] {
        match self {
            EntityType::Faculties => &[],
            EntityType::FacultyProfessors => &[EntityType::Faculties],
            EntityType::FacultyStudents => &[EntityType::Faculties],
            EntityType::Subjects => &[EntityType::Faculties],
            EntityType::SubjectProfessors => {
                &[EntityType::Subjects, EntityType::FacultyProfessors]
            }
            EntityType::Lectures => &[EntityType::Subjects],
            EntityType::LectureMaterials => &[EntityType::Lectures],
            EntityType::Enrollments => &[EntityType::Subjects, EntityType::FacultyStudents],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEntityType(s.to_string()))
    }
}

/// Error for entity-type names outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

/// A reference from a row to a required parent row in the destination,
/// expressed as the parent's natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub entity: EntityType,
    pub natural_key: String,
}

impl ParentRef {
    pub fn new(entity: EntityType, natural_key: impl Into<String>) -> Self {
        Self {
            entity,
            natural_key: natural_key.into(),
        }
    }
}

/// A typed row of one entity collection.
///
/// `natural_key` identifies the row across schemas; the surrogate `id` is
/// schema-local and never compared between schemas.
pub trait EntityRecord: Clone + PartialEq + Serialize + DeserializeOwned {
    /// The entity type this record belongs to.
    const ENTITY: EntityType;

    /// Schema-local surrogate id.
    fn id(&self) -> u64;

    /// Assign a schema-local surrogate id (used on insert).
    fn set_id(&mut self, id: u64);

    /// Cross-schema identity of this row.
    fn natural_key(&self) -> String;

    /// Natural keys of required parent rows.
    fn parent_refs(&self) -> Vec<ParentRef>;

    /// Payload equality, ignoring the surrogate id.
    fn content_eq(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.set_id(0);
        b.set_id(0);
        a == b
    }
}

/// A typed entity collection tagged by entity type.
///
/// This is the only shape accepted on import: the payload is validated by
/// deserialization before any reconciliation step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "data", rename_all = "snake_case")]
pub enum EntityCollection {
    Faculties(Vec<Faculty>),
    FacultyProfessors(Vec<FacultyProfessor>),
    FacultyStudents(Vec<FacultyStudent>),
    Subjects(Vec<Subject>),
    SubjectProfessors(Vec<SubjectProfessor>),
    Lectures(Vec<Lecture>),
    LectureMaterials(Vec<LectureMaterial>),
    Enrollments(Vec<Enrollment>),
}

impl EntityCollection {
    /// The entity type this collection carries.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityCollection::Faculties(_) => EntityType::Faculties,
            EntityCollection::FacultyProfessors(_) => EntityType::FacultyProfessors,
            EntityCollection::FacultyStudents(_) => EntityType::FacultyStudents,
            EntityCollection::Subjects(_) => EntityType::Subjects,
            EntityCollection::SubjectProfessors(_) => EntityType::SubjectProfessors,
            EntityCollection::Lectures(_) => EntityType::Lectures,
            EntityCollection::LectureMaterials(_) => EntityType::LectureMaterials,
            EntityCollection::Enrollments(_) => EntityType::Enrollments,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            EntityCollection::Faculties(rows) => rows.len(),
            EntityCollection::FacultyProfessors(rows) => rows.len(),
            EntityCollection::FacultyStudents(rows) => rows.len(),
            EntityCollection::Subjects(rows) => rows.len(),
            EntityCollection::SubjectProfessors(rows) => rows.len(),
            EntityCollection::Lectures(rows) => rows.len(),
            EntityCollection::LectureMaterials(rows) => rows.len(),
            EntityCollection::Enrollments(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names_roundtrip() {
        for entity in EntityType::ALL {
            let parsed: EntityType = entity.as_str().parse().unwrap();
            assert_eq!(parsed, entity);
        }
    }

    #[test]
    fn test_unknown_entity_type_rejected() {
        let result = "universities".parse::<EntityType>();
        assert!(result.is_err());
    }

    #[test]
    fn test_parents_precede_children_in_all() {
        let position = |e: EntityType| EntityType::ALL.iter().position(|x| *x == e).unwrap();

        for entity in EntityType::ALL {
            for parent in entity.parents() {
                assert!(
                    position(*parent) < position(entity),
                    "{} must come before {}",
                    parent,
                    entity
                );
            }
        }
    }

    #[test]
    fn test_collection_tag_format() {
        let collection = EntityCollection::Faculties(vec![Faculty {
            id: 1,
            code: "FIT".to_string(),
            name: "Faculty of IT".to_string(),
            description: None,
        }]);

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["entity_type"], "faculties");
        assert!(json["data"].is_array());
    }

    #[test]
    fn test_collection_rejects_mismatched_rows() {
        // subject rows under a faculties tag must fail validation
        let json = r#"{"entity_type":"faculties","data":[{"id":1,"faculty_code":"FIT","code":"CS101","name":"Intro","semester":1,"espb":6}]}"#;
        let result: Result<EntityCollection, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_content_eq_ignores_surrogate_id() {
        let a = Faculty {
            id: 1,
            code: "FIT".to_string(),
            name: "Faculty of IT".to_string(),
            description: None,
        };
        let mut b = a.clone();
        b.id = 42;

        assert!(a.content_eq(&b));
    }
}
