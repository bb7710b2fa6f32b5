use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{Course, NewCourse};

const COURSE_COLUMNS: &str = "id, name, description, credits, instructor, created_at";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        credits: row.get(3)?,
        instructor: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Every course, newest first.
pub fn fetch_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY id DESC"
        ))
        .context("failed to prepare course query")?;

    let courses = stmt
        .query_map([], course_from_row)
        .context("failed to load courses")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect courses")?;

    Ok(courses)
}

pub fn find_course(conn: &Connection, id: i64) -> Result<Option<Course>> {
    let course = conn
        .query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
            [id],
            course_from_row,
        )
        .optional()
        .context("failed to load course")?;
    Ok(course)
}

pub fn course_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )
        .context("failed to check course")?;
    Ok(exists)
}

pub fn insert_course(conn: &Connection, course: &NewCourse) -> Result<i64> {
    conn.execute(
        "INSERT INTO courses (name, description, credits, instructor, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            course.name,
            course.description,
            course.credits,
            course.instructor,
            Utc::now()
        ],
    )
    .context("failed to insert course")?;

    Ok(conn.last_insert_rowid())
}

pub fn update_course(conn: &Connection, course: &Course) -> Result<usize> {
    let updated = conn
        .execute(
            "UPDATE courses SET name = ?1, description = ?2, credits = ?3, instructor = ?4
             WHERE id = ?5",
            params![
                course.name,
                course.description,
                course.credits,
                course.instructor,
                course.id
            ],
        )
        .context("failed to update course")?;
    Ok(updated)
}

/// Remove a course. Enrollments referencing it cascade.
pub fn delete_course(conn: &Connection, id: i64) -> Result<usize> {
    let deleted = conn
        .execute("DELETE FROM courses WHERE id = ?1", [id])
        .context("failed to delete course")?;
    Ok(deleted)
}

pub fn count_courses(conn: &Connection) -> Result<i64> {
    let count = conn
        .query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))
        .context("failed to count courses")?;
    Ok(count)
}
