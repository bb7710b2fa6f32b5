//! Domain models that mirror the SQLite schema and travel through the API and
//! the TUI. The row types stay plain data holders; the request types carry the
//! normalization and merge rules so every caller applies them the same way.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A row of the `students` table.
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A row of the `courses` table. `credits` is free-form at the store level;
/// only the TUI form bounds it.
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub credits: Option<i64>,
    pub instructor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.credits {
            Some(credits) => write!(f, "{} ({credits} cr)", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A row of the `enrollments` join table.
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: i64,
    pub name: String,
    pub credits: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// An enrollment joined with enough of its student and course to render a
/// listing without further lookups.
pub struct EnrollmentDetail {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub student: StudentSummary,
    pub course: CourseSummary,
}

/// Body of `POST /students`. Fields are optional at the wire level so a
/// missing name surfaces as a validation error instead of a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A student that passed validation and is ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl StudentInput {
    /// Returns `None` when name or email is missing or blank.
    pub fn validate(self) -> Option<NewStudent> {
        Some(NewStudent {
            name: required(self.name)?,
            email: required(self.email)?,
            phone: optional(self.phone),
            address: optional(self.address),
        })
    }
}

/// Body of `POST /courses`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i64>,
    pub instructor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub name: String,
    pub description: Option<String>,
    pub credits: Option<i64>,
    pub instructor: Option<String>,
}

impl CourseInput {
    /// Returns `None` when the name is missing or blank.
    pub fn validate(self) -> Option<NewCourse> {
        Some(NewCourse {
            name: required(self.name)?,
            description: optional(self.description),
            credits: self.credits,
            instructor: optional(self.instructor),
        })
    }
}

/// Body of `POST /enrollments`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentInput {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
}

/// A partial update merged over a stored record. Omitted fields keep the
/// stored value; optional columns take `null` to clear.
pub trait Patch<T> {
    fn apply_to(self, current: T) -> T;
}

/// Body of `PUT /students/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Option<String>>,
}

impl Patch<Student> for StudentPatch {
    fn apply_to(self, current: Student) -> Student {
        Student {
            name: merge_required(self.name, current.name),
            email: merge_required(self.email, current.email),
            phone: merge_optional(self.phone, current.phone),
            address: merge_optional(self.address, current.address),
            ..current
        }
    }
}

/// Body of `PUT /courses/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoursePatch {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub credits: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub instructor: Option<Option<String>>,
}

impl Patch<Course> for CoursePatch {
    fn apply_to(self, current: Course) -> Course {
        Course {
            name: merge_required(self.name, current.name),
            description: merge_optional(self.description, current.description),
            credits: self.credits.unwrap_or(current.credits),
            instructor: merge_optional(self.instructor, current.instructor),
            ..current
        }
    }
}

/// Trim a required value; blank counts as missing.
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Trim an optional value; blank is stored as NULL.
fn optional(value: Option<String>) -> Option<String> {
    required(value)
}

/// A required column can only be replaced by a non-blank value.
fn merge_required(patch: Option<String>, current: String) -> String {
    required(patch).unwrap_or(current)
}

/// A provided optional value always wins; `null` or blank clears the column.
fn merge_optional(patch: Option<Option<String>>, current: Option<String>) -> Option<String> {
    match patch {
        Some(value) => optional(value),
        None => current,
    }
}

/// Marks a field that appeared in the body, so `null` reads as `Some(None)`
/// while an absent field stays `None` through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        Student {
            id: 7,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
            address: Some("12 Analytical Row".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn phone_only_patch_keeps_other_fields() {
        let before = student();
        let patch = StudentPatch {
            phone: Some(Some("555-0100".into())),
            ..Default::default()
        };
        let after = patch.apply_to(before.clone());
        assert_eq!(after.phone.as_deref(), Some("555-0100"));
        assert_eq!(after.name, before.name);
        assert_eq!(after.email, before.email);
        assert_eq!(after.address, before.address);
        assert_eq!(after.id, before.id);
    }

    #[test]
    fn blank_required_field_in_patch_is_ignored() {
        let patch = StudentPatch {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(student()).name, "Ada");
    }

    #[test]
    fn blank_optional_field_in_patch_clears_it() {
        let patch = StudentPatch {
            address: Some(Some(String::new())),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(student()).address, None);
    }

    #[test]
    fn null_clears_but_absent_keeps() {
        let patch: StudentPatch = serde_json::from_str(r#"{"address": null}"#).unwrap();
        assert_eq!(patch.address, Some(None));
        assert_eq!(patch.phone, None);
        let after = patch.apply_to(student());
        assert_eq!(after.address, None);
        assert_eq!(after.name, "Ada");
    }

    #[test]
    fn student_input_requires_name_and_email() {
        let missing_email = StudentInput {
            name: Some("Ada".into()),
            ..Default::default()
        };
        assert!(missing_email.validate().is_none());

        let valid = StudentInput {
            name: Some("  Ada ".into()),
            email: Some("ada@example.com".into()),
            phone: Some(" ".into()),
            address: None,
        }
        .validate()
        .unwrap();
        assert_eq!(valid.name, "Ada");
        assert_eq!(valid.phone, None);
    }

    #[test]
    fn course_patch_keeps_credits_when_omitted() {
        let course = Course {
            id: 1,
            name: "Algebra".into(),
            description: None,
            credits: Some(4),
            instructor: None,
            created_at: Utc::now(),
        };
        let patch = CoursePatch {
            instructor: Some(Some("Noether".into())),
            ..Default::default()
        };
        let merged = patch.apply_to(course.clone());
        assert_eq!(merged.credits, Some(4));
        assert_eq!(merged.instructor.as_deref(), Some("Noether"));

        let cleared: CoursePatch = serde_json::from_str(r#"{"credits": null}"#).unwrap();
        assert_eq!(cleared.apply_to(course).credits, None);
    }

    #[test]
    fn enrollment_detail_flattens_the_row() {
        let detail = EnrollmentDetail {
            enrollment: Enrollment {
                id: 3,
                student_id: 1,
                course_id: 2,
                enrolled_at: Utc::now(),
            },
            student: StudentSummary {
                id: 1,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            course: CourseSummary {
                id: 2,
                name: "Algebra".into(),
                credits: Some(4),
            },
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["student_id"], 1);
        assert_eq!(json["student"]["name"], "Ada");
        assert_eq!(json["course"]["credits"], 4);
    }
}
