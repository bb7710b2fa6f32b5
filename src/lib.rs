//! School records: students, courses and the enrollments linking them, served
//! over a JSON API with a terminal UI on top.
pub mod api;
pub mod cli;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod ui;

pub use db::{Store, StoreConfig};
pub use error::{RecordError, Result};

pub use models::{Course, Enrollment, EnrollmentDetail, Student};

pub use ui::{run_app, ApiClient, App};
