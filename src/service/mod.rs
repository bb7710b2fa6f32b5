//! Resource services: validation, merge, and not-found translation layered on
//! the query helpers in [`crate::db`]. Everything here is synchronous and
//! expects to run on a borrowed pooled connection.

pub mod courses;
pub mod enrollments;
pub mod students;
