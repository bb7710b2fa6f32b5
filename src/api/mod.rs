//! REST surface: one router per resource nested under `/api`, plus `/health`.

mod config;
mod courses;
mod enrollments;
mod error;
mod health;
mod server;
mod shutdown;
mod students;

use axum::Router;

use crate::db::Store;

pub use config::ServerConfig;
pub use error::{ApiError, MessageBody};
pub use health::HealthResponse;
pub use server::HttpServer;
pub use shutdown::shutdown_signal;

/// Shared by every handler. Cloning only bumps the pool's reference count.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

/// The bare router without CORS or tracing layers. Tests and the TUI client
/// drive it in-process.
pub fn router(store: Store) -> Router {
    Router::new()
        .merge(health::health_routes())
        .nest("/api/students", students::student_routes())
        .nest("/api/courses", courses::course_routes())
        .nest("/api/enrollments", enrollments::enrollment_routes())
        .with_state(AppState { store })
}
