//! Persistence module split across logical submodules. Each function wraps one
//! query; the services decide what a missing row means.

mod connection;
mod courses;
mod enrollments;
mod students;

pub use connection::{begin_write, default_db_path, ping, Store, StoreConfig};
pub use courses::{
    count_courses, course_exists, delete_course, fetch_courses, find_course, insert_course,
    update_course,
};
pub use enrollments::{
    count_enrollments, delete_enrollment, enrollment_exists, fetch_enrollments, find_enrollment,
    insert_enrollment, pair_exists, DUPLICATE_ENROLLMENT,
};
pub use students::{
    count_students, delete_student, fetch_students, find_student, insert_student, student_exists,
    update_student,
};
