//! Typed entity records
//!
//! Natural keys are composed from business identifiers (codes, emails,
//! index numbers), joined with "::". Surrogate ids are per-schema sequences
//! and carry no cross-schema meaning.

use serde::{Deserialize, Serialize};

use super::{EntityRecord, EntityType, ParentRef};

/// A faculty within the institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Faculty {
    pub id: u64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl EntityRecord for Faculty {
    const ENTITY: EntityType = EntityType::Faculties;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        self.code.clone()
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        Vec::new()
    }
}

/// A professor employed by a faculty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacultyProfessor {
    pub id: u64,
    pub faculty_code: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl EntityRecord for FacultyProfessor {
    const ENTITY: EntityType = EntityType::FacultyProfessors;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!("{}::{}", self.faculty_code, self.email)
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(EntityType::Faculties, &self.faculty_code)]
    }
}

/// A student enrolled at a faculty, identified by index number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacultyStudent {
    pub id: u64,
    pub faculty_code: String,
    pub index_number: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl EntityRecord for FacultyStudent {
    const ENTITY: EntityType = EntityType::FacultyStudents;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!("{}::{}", self.faculty_code, self.index_number)
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(EntityType::Faculties, &self.faculty_code)]
    }
}

/// A subject taught at a faculty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subject {
    pub id: u64,
    pub faculty_code: String,
    pub code: String,
    pub name: String,
    pub semester: u8,
    pub espb: u8,
}

impl EntityRecord for Subject {
    const ENTITY: EntityType = EntityType::Subjects;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!("{}::{}", self.faculty_code, self.code)
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(EntityType::Faculties, &self.faculty_code)]
    }
}

/// A professor assigned to teach a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectProfessor {
    pub id: u64,
    pub faculty_code: String,
    pub subject_code: String,
    pub professor_email: String,
}

impl EntityRecord for SubjectProfessor {
    const ENTITY: EntityType = EntityType::SubjectProfessors;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!(
            "{}::{}::{}",
            self.faculty_code, self.subject_code, self.professor_email
        )
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![
            ParentRef::new(
                EntityType::Subjects,
                format!("{}::{}", self.faculty_code, self.subject_code),
            ),
            ParentRef::new(
                EntityType::FacultyProfessors,
                format!("{}::{}", self.faculty_code, self.professor_email),
            ),
        ]
    }
}

/// A lecture within a subject, ordered by ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lecture {
    pub id: u64,
    pub faculty_code: String,
    pub subject_code: String,
    pub ordinal: u32,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
}

impl EntityRecord for Lecture {
    const ENTITY: EntityType = EntityType::Lectures;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!(
            "{}::{}::{}",
            self.faculty_code, self.subject_code, self.ordinal
        )
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(
            EntityType::Subjects,
            format!("{}::{}", self.faculty_code, self.subject_code),
        )]
    }
}

/// Supplementary material attached to a lecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LectureMaterial {
    pub id: u64,
    pub faculty_code: String,
    pub subject_code: String,
    pub lecture_ordinal: u32,
    pub title: String,
    pub url: String,
}

impl EntityRecord for LectureMaterial {
    const ENTITY: EntityType = EntityType::LectureMaterials;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!(
            "{}::{}::{}::{}",
            self.faculty_code, self.subject_code, self.lecture_ordinal, self.title
        )
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(
            EntityType::Lectures,
            format!(
                "{}::{}::{}",
                self.faculty_code, self.subject_code, self.lecture_ordinal
            ),
        )]
    }
}

/// A student's enrollment in a subject for a school year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Enrollment {
    pub id: u64,
    pub faculty_code: String,
    pub subject_code: String,
    pub student_index: String,
    pub school_year: String,
}

impl EntityRecord for Enrollment {
    const ENTITY: EntityType = EntityType::Enrollments;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn natural_key(&self) -> String {
        format!(
            "{}::{}::{}::{}",
            self.faculty_code, self.subject_code, self.student_index, self.school_year
        )
    }

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![
            ParentRef::new(
                EntityType::Subjects,
                format!("{}::{}", self.faculty_code, self.subject_code),
            ),
            ParentRef::new(
                EntityType::FacultyStudents,
                format!("{}::{}", self.faculty_code, self.student_index),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faculty_natural_key_is_code() {
        let faculty = Faculty {
            id: 7,
            code: "FIT".to_string(),
            name: "Faculty of IT".to_string(),
            description: None,
        };
        assert_eq!(faculty.natural_key(), "FIT");
    }

    #[test]
    fn test_subject_professor_parent_refs() {
        let assignment = SubjectProfessor {
            id: 1,
            faculty_code: "FIT".to_string(),
            subject_code: "CS101".to_string(),
            professor_email: "ana@uni.example".to_string(),
        };

        let refs = assignment.parent_refs();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].entity, EntityType::Subjects);
        assert_eq!(refs[0].natural_key, "FIT::CS101");
        assert_eq!(refs[1].entity, EntityType::FacultyProfessors);
        assert_eq!(refs[1].natural_key, "FIT::ana@uni.example");
    }

    #[test]
    fn test_lecture_material_points_at_lecture() {
        let material = LectureMaterial {
            id: 3,
            faculty_code: "FIT".to_string(),
            subject_code: "CS101".to_string(),
            lecture_ordinal: 2,
            title: "Slides".to_string(),
            url: "https://files.example/slides.pdf".to_string(),
        };

        let refs = material.parent_refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].entity, EntityType::Lectures);
        assert_eq!(refs[0].natural_key, "FIT::CS101::2");
    }

    #[test]
    fn test_record_json_roundtrip() {
        let enrollment = Enrollment {
            id: 9,
            faculty_code: "FIT".to_string(),
            subject_code: "CS101".to_string(),
            student_index: "2023/0042".to_string(),
            school_year: "2025/26".to_string(),
        };

        let json = serde_json::to_string(&enrollment).unwrap();
        let parsed: Enrollment = serde_json::from_str(&json).unwrap();
        assert_eq!(enrollment, parsed);
    }
}
