//! School, classroom and person identities consumed by the rollups.
//!
//! Managing these records is an administrative concern; the core only reads them to know
//! which persons make up a classroom or a school.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque person (student) identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(pub String);

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchoolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    #[serde(default)]
    pub center_code: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Classroom label within a school. Blank labels collapse to [`ClassroomLabel::UNASSIGNED`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub struct ClassroomLabel(String);

impl ClassroomLabel {
    pub const UNASSIGNED: &'static str = "unassigned";

    pub fn new(label: impl AsRef<str>) -> Self {
        let trimmed = label.as_ref().trim();
        if trimmed.is_empty() {
            Self::unassigned()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn unassigned() -> Self {
        Self(Self::UNASSIGNED.to_string())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0 == Self::UNASSIGNED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Option<String>> for ClassroomLabel {
    fn from(value: Option<String>) -> Self {
        value.map(Self::new).unwrap_or_else(Self::unassigned)
    }
}

impl From<ClassroomLabel> for String {
    fn from(value: ClassroomLabel) -> Self {
        value.0
    }
}

impl fmt::Display for ClassroomLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A classroom is identified by its school and label together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassroomKey {
    pub school_id: SchoolId,
    pub label: ClassroomLabel,
}

impl fmt::Display for ClassroomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.school_id, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub school_id: SchoolId,
    #[serde(default = "ClassroomLabel::unassigned")]
    pub classroom: ClassroomLabel,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Person {
    pub fn classroom_key(&self) -> ClassroomKey {
        ClassroomKey {
            school_id: self.school_id.clone(),
            label: self.classroom.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_labels_are_unassigned() {
        assert!(ClassroomLabel::new("   ").is_unassigned());
        assert!(ClassroomLabel::from(None).is_unassigned());
        assert_eq!(ClassroomLabel::new(" 3B ").as_str(), "3B");
    }

    #[test]
    fn person_deserializes_without_classroom() {
        let person: Person = serde_json::from_str(r#"{"id":"s-1","school_id":"sch-1"}"#)
            .expect("person parses");
        assert!(person.classroom.is_unassigned());

        let person: Person =
            serde_json::from_str(r#"{"id":"s-2","school_id":"sch-1","classroom":null}"#)
                .expect("person parses");
        assert!(person.classroom.is_unassigned());
    }
}
