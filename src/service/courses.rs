use anyhow::Context;
use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::error::{RecordError, Result};
use crate::models::{Course, CourseInput, CoursePatch, Patch};

const RESOURCE: &str = "Course";

pub fn list(conn: &Connection) -> Result<Vec<Course>> {
    db::fetch_courses(conn)
}

pub fn get(conn: &Connection, id: i64) -> Result<Course> {
    db::find_course(conn, id)?.ok_or(RecordError::NotFound(RESOURCE))
}

pub fn create(conn: &Connection, input: CourseInput) -> Result<Course> {
    let course = input
        .validate()
        .ok_or_else(|| RecordError::validation("Course name is required"))?;
    let id = db::insert_course(conn, &course)?;
    debug!(id, "course created");
    get(conn, id)
}

pub fn update(conn: &Connection, id: i64, patch: CoursePatch) -> Result<Course> {
    let tx = db::begin_write(conn)?;

    let merged = patch.apply_to(get(&tx, id)?);
    if db::update_course(&tx, &merged)? == 0 {
        return Err(RecordError::NotFound(RESOURCE));
    }
    let updated = get(&tx, id)?;

    tx.commit().context("failed to commit course update")?;
    debug!(id, "course updated");
    Ok(updated)
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    if db::delete_course(conn, id)? == 0 {
        return Err(RecordError::NotFound(RESOURCE));
    }
    debug!(id, "course deleted");
    Ok(())
}
