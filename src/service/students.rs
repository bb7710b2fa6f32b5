use anyhow::Context;
use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::error::{RecordError, Result};
use crate::models::{Patch, Student, StudentInput, StudentPatch};

const RESOURCE: &str = "Student";

pub fn list(conn: &Connection) -> Result<Vec<Student>> {
    db::fetch_students(conn)
}

pub fn get(conn: &Connection, id: i64) -> Result<Student> {
    db::find_student(conn, id)?.ok_or(RecordError::NotFound(RESOURCE))
}

/// Validate before touching the store, insert, then re-read the row so the
/// caller sees exactly what was persisted.
pub fn create(conn: &Connection, input: StudentInput) -> Result<Student> {
    let student = input
        .validate()
        .ok_or_else(|| RecordError::validation("Name and email are required"))?;
    let id = db::insert_student(conn, &student)?;
    debug!(id, "student created");
    get(conn, id)
}

/// Merge the patch over the stored row inside one transaction.
pub fn update(conn: &Connection, id: i64, patch: StudentPatch) -> Result<Student> {
    let tx = db::begin_write(conn)?;

    let merged = patch.apply_to(get(&tx, id)?);
    if db::update_student(&tx, &merged)? == 0 {
        return Err(RecordError::NotFound(RESOURCE));
    }
    let updated = get(&tx, id)?;

    tx.commit().context("failed to commit student update")?;
    debug!(id, "student updated");
    Ok(updated)
}

/// Remove the student and, through the schema cascade, their enrollments.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    if db::delete_student(conn, id)? == 0 {
        return Err(RecordError::NotFound(RESOURCE));
    }
    debug!(id, "student deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn input(name: &str, email: &str) -> StudentInput {
        StudentInput {
            name: Some(name.into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    fn with_store<T>(f: impl FnOnce(&Connection) -> Result<T>) -> T {
        Store::open_in_memory().unwrap().with_conn(f).unwrap()
    }

    #[test]
    fn list_is_newest_first() {
        let names = with_store(|conn| {
            for name in ["A", "B", "C"] {
                create(conn, input(name, &format!("{name}@example.com")))?;
            }
            Ok(list(conn)?.into_iter().map(|s| s.name).collect::<Vec<_>>())
        });
        assert_eq!(names, ["C", "B", "A"]);
    }

    #[test]
    fn create_returns_persisted_row() {
        let student = with_store(|conn| {
            create(
                conn,
                StudentInput {
                    phone: Some("555-0100".into()),
                    ..input("Ada", "ada@example.com")
                },
            )
        });
        assert!(student.id > 0);
        assert_eq!(student.phone.as_deref(), Some("555-0100"));
        assert_eq!(student.address, None);
    }

    #[test]
    fn create_without_email_writes_nothing() {
        let (err, count) = with_store(|conn| {
            let err = create(
                conn,
                StudentInput {
                    name: Some("Ada".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
            Ok((err, db::count_students(conn)?))
        });
        assert!(matches!(err, RecordError::Validation(_)));
        assert_eq!(count, 0);
    }

    #[test]
    fn phone_update_leaves_other_fields() {
        let (before, after) = with_store(|conn| {
            let before = create(
                conn,
                StudentInput {
                    address: Some("1 Main St".into()),
                    ..input("Ada", "ada@example.com")
                },
            )?;
            let after = update(
                conn,
                before.id,
                StudentPatch {
                    phone: Some(Some("555-0199".into())),
                    ..Default::default()
                },
            )?;
            Ok((before, after))
        });
        assert_eq!(after.phone.as_deref(), Some("555-0199"));
        assert_eq!(after.name, before.name);
        assert_eq!(after.email, before.email);
        assert_eq!(after.address, before.address);
    }

    #[test]
    fn update_missing_student_is_not_found() {
        let err = with_store(|conn| Ok(update(conn, 42, StudentPatch::default()).unwrap_err()));
        assert!(matches!(err, RecordError::NotFound("Student")));
    }

    #[test]
    fn delete_missing_student_leaves_store_untouched() {
        let (err, count) = with_store(|conn| {
            create(conn, input("Ada", "ada@example.com"))?;
            let err = delete(conn, 999).unwrap_err();
            Ok((err, db::count_students(conn)?))
        });
        assert!(matches!(err, RecordError::NotFound("Student")));
        assert_eq!(count, 1);
    }

    #[test]
    fn get_after_delete_is_not_found() {
        let err = with_store(|conn| {
            let student = create(conn, input("Ada", "ada@example.com"))?;
            delete(conn, student.id)?;
            Ok(get(conn, student.id).unwrap_err())
        });
        assert!(matches!(err, RecordError::NotFound("Student")));
    }
}
