use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{NewStudent, Student};

const STUDENT_COLUMNS: &str = "id, name, email, phone, address, created_at";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Every student, newest first.
pub fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY id DESC"
        ))
        .context("failed to prepare student query")?;

    let students = stmt
        .query_map([], student_from_row)
        .context("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect students")?;

    Ok(students)
}

pub fn find_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    let student = conn
        .query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            [id],
            student_from_row,
        )
        .optional()
        .context("failed to load student")?;
    Ok(student)
}

pub fn student_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )
        .context("failed to check student")?;
    Ok(exists)
}

/// Insert a student and return the generated id.
pub fn insert_student(conn: &Connection, student: &NewStudent) -> Result<i64> {
    conn.execute(
        "INSERT INTO students (name, email, phone, address, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            student.name,
            student.email,
            student.phone,
            student.address,
            Utc::now()
        ],
    )
    .context("failed to insert student")?;

    Ok(conn.last_insert_rowid())
}

/// Write every editable column. Returns the number of rows touched so the
/// caller can tell a vanished row from a successful write.
pub fn update_student(conn: &Connection, student: &Student) -> Result<usize> {
    let updated = conn
        .execute(
            "UPDATE students SET name = ?1, email = ?2, phone = ?3, address = ?4 WHERE id = ?5",
            params![
                student.name,
                student.email,
                student.phone,
                student.address,
                student.id
            ],
        )
        .context("failed to update student")?;
    Ok(updated)
}

/// Remove a student. The schema cascades to `enrollments`.
pub fn delete_student(conn: &Connection, id: i64) -> Result<usize> {
    let deleted = conn
        .execute("DELETE FROM students WHERE id = ?1", [id])
        .context("failed to delete student")?;
    Ok(deleted)
}

pub fn count_students(conn: &Connection) -> Result<i64> {
    let count = conn
        .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))
        .context("failed to count students")?;
    Ok(count)
}
