use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row};

use crate::error::{RecordError, Result};
use crate::models::{CourseSummary, Enrollment, EnrollmentDetail, StudentSummary};

/// Message shared by the pre-insert check and the constraint translation.
pub const DUPLICATE_ENROLLMENT: &str = "Student already enrolled in this course";

const DETAIL_QUERY: &str = "SELECT e.id, e.student_id, e.course_id, e.enrolled_at,
                                  s.name, s.email, c.name, c.credits
                           FROM enrollments e
                           INNER JOIN students s ON s.id = e.student_id
                           INNER JOIN courses c ON c.id = e.course_id";

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<EnrollmentDetail> {
    let student_id: i64 = row.get(1)?;
    let course_id: i64 = row.get(2)?;
    Ok(EnrollmentDetail {
        enrollment: Enrollment {
            id: row.get(0)?,
            student_id,
            course_id,
            enrolled_at: row.get(3)?,
        },
        student: StudentSummary {
            id: student_id,
            name: row.get(4)?,
            email: row.get(5)?,
        },
        course: CourseSummary {
            id: course_id,
            name: row.get(6)?,
            credits: row.get(7)?,
        },
    })
}

/// Every enrollment with its student and course, newest first.
pub fn fetch_enrollments(conn: &Connection) -> Result<Vec<EnrollmentDetail>> {
    let mut stmt = conn
        .prepare(&format!("{DETAIL_QUERY} ORDER BY e.id DESC"))
        .context("failed to prepare enrollment query")?;

    let enrollments = stmt
        .query_map([], detail_from_row)
        .context("failed to load enrollments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect enrollments")?;

    Ok(enrollments)
}

pub fn find_enrollment(conn: &Connection, id: i64) -> Result<Option<EnrollmentDetail>> {
    let enrollment = conn
        .query_row(
            &format!("{DETAIL_QUERY} WHERE e.id = ?1"),
            [id],
            detail_from_row,
        )
        .optional()
        .context("failed to load enrollment")?;
    Ok(enrollment)
}

pub fn enrollment_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )
        .context("failed to check enrollment")?;
    Ok(exists)
}

/// Whether the student already holds a seat in the course.
pub fn pair_exists(conn: &Connection, student_id: i64, course_id: i64) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM enrollments WHERE student_id = ?1 AND course_id = ?2
             )",
            params![student_id, course_id],
            |row| row.get(0),
        )
        .context("failed to check existing enrollment")?;
    Ok(exists)
}

/// Insert the pair and return the stored row. The `UNIQUE (student_id,
/// course_id)` constraint is the final word on duplicates; a violation comes
/// back as [`RecordError::Conflict`].
pub fn insert_enrollment(conn: &Connection, student_id: i64, course_id: i64) -> Result<Enrollment> {
    let enrolled_at = Utc::now();
    conn.execute(
        "INSERT INTO enrollments (student_id, course_id, enrolled_at) VALUES (?1, ?2, ?3)",
        params![student_id, course_id, enrolled_at],
    )
    .map_err(map_unique_constraint)?;

    Ok(Enrollment {
        id: conn.last_insert_rowid(),
        student_id,
        course_id,
        enrolled_at,
    })
}

pub fn delete_enrollment(conn: &Connection, id: i64) -> Result<usize> {
    let deleted = conn
        .execute("DELETE FROM enrollments WHERE id = ?1", [id])
        .context("failed to delete enrollment")?;
    Ok(deleted)
}

pub fn count_enrollments(conn: &Connection) -> Result<i64> {
    let count = conn
        .query_row("SELECT COUNT(*) FROM enrollments", [], |row| row.get(0))
        .context("failed to count enrollments")?;
    Ok(count)
}

/// Coerce the uniqueness violation into a conflict. Foreign key violations
/// share the same primary code, so only the unique extended code counts.
fn map_unique_constraint(err: SqlError) -> RecordError {
    let unique_violation = matches!(
        &err,
        SqlError::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    );

    if unique_violation {
        RecordError::conflict(DUPLICATE_ENROLLMENT)
    } else {
        RecordError::Store(anyhow::Error::new(err).context("failed to insert enrollment"))
    }
}
