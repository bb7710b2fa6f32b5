//! Enrollment operations and the integrity checks that guard new pairs.

use anyhow::Context;
use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::error::{RecordError, Result};
use crate::models::{Enrollment, EnrollmentDetail, EnrollmentInput};

const RESOURCE: &str = "Enrollment";

pub fn list(conn: &Connection) -> Result<Vec<EnrollmentDetail>> {
    db::fetch_enrollments(conn)
}

pub fn get(conn: &Connection, id: i64) -> Result<EnrollmentDetail> {
    db::find_enrollment(conn, id)?.ok_or(RecordError::NotFound(RESOURCE))
}

/// Check that a pair may be inserted. Each step short-circuits: student,
/// then course, then duplicate.
pub fn check_candidate(conn: &Connection, student_id: i64, course_id: i64) -> Result<()> {
    if !db::student_exists(conn, student_id)? {
        return Err(RecordError::NotFound("Student"));
    }
    if !db::course_exists(conn, course_id)? {
        return Err(RecordError::NotFound("Course"));
    }
    if db::pair_exists(conn, student_id, course_id)? {
        return Err(RecordError::conflict(db::DUPLICATE_ENROLLMENT));
    }
    Ok(())
}

/// Enroll a student in a course. The checks and the insert share one
/// transaction, and a concurrent insert that slips past the checks is still
/// stopped by the unique constraint.
pub fn create(conn: &Connection, input: EnrollmentInput) -> Result<Enrollment> {
    let (student_id, course_id) = match (input.student_id, input.course_id) {
        (Some(student_id), Some(course_id)) => (student_id, course_id),
        _ => {
            return Err(RecordError::validation(
                "Student ID and Course ID are required",
            ))
        }
    };

    let tx = db::begin_write(conn)?;
    check_candidate(&tx, student_id, course_id)?;
    let enrollment = db::insert_enrollment(&tx, student_id, course_id)?;
    tx.commit().context("failed to commit enrollment")?;

    debug!(id = enrollment.id, student_id, course_id, "enrollment created");
    Ok(enrollment)
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    if !db::enrollment_exists(conn, id)? {
        return Err(RecordError::NotFound(RESOURCE));
    }
    db::delete_enrollment(conn, id)?;
    debug!(id, "enrollment deleted");
    Ok(())
}
