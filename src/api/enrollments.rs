use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::error::{failed, record_id, ApiError, MessageBody};
use super::AppState;
use crate::models::{Enrollment, EnrollmentDetail, EnrollmentInput};
use crate::service::enrollments;

const RESOURCE: &str = "Enrollment";

/// Enrollments are created and deleted, never edited.
pub fn enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(create_enrollment))
        .route("/:id", get(get_enrollment).delete(delete_enrollment))
}

async fn list_enrollments(
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrollmentDetail>>, ApiError> {
    let rows = state
        .store
        .run(enrollments::list)
        .await
        .map_err(failed("Error fetching enrollments"))?;
    Ok(Json(rows))
}

async fn get_enrollment(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<EnrollmentDetail>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    let enrollment = state
        .store
        .run(move |conn| enrollments::get(conn, id))
        .await
        .map_err(failed("Error fetching enrollment"))?;
    Ok(Json(enrollment))
}

async fn create_enrollment(
    State(state): State<AppState>,
    payload: Result<Json<EnrollmentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Enrollment>), ApiError> {
    let Json(input) = payload?;
    let enrollment = state
        .store
        .run(move |conn| enrollments::create(conn, input))
        .await
        .map_err(failed("Error creating enrollment"))?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn delete_enrollment(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    state
        .store
        .run(move |conn| enrollments::delete(conn, id))
        .await
        .map_err(failed("Error deleting enrollment"))?;
    Ok(Json(MessageBody::new("Enrollment deleted successfully")))
}
