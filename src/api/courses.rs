use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::error::{failed, record_id, ApiError, MessageBody};
use super::AppState;
use crate::models::{Course, CourseInput, CoursePatch};
use crate::service::courses;

const RESOURCE: &str = "Course";

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route(
            "/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, ApiError> {
    let rows = state
        .store
        .run(courses::list)
        .await
        .map_err(failed("Error fetching courses"))?;
    Ok(Json(rows))
}

async fn get_course(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Course>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    let course = state
        .store
        .run(move |conn| courses::get(conn, id))
        .await
        .map_err(failed("Error fetching course"))?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    let Json(input) = payload?;
    let course = state
        .store
        .run(move |conn| courses::create(conn, input))
        .await
        .map_err(failed("Error creating course"))?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CoursePatch>, JsonRejection>,
) -> Result<Json<Course>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    let Json(patch) = payload?;
    let course = state
        .store
        .run(move |conn| courses::update(conn, id, patch))
        .await
        .map_err(failed("Error updating course"))?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    state
        .store
        .run(move |conn| courses::delete(conn, id))
        .await
        .map_err(failed("Error deleting course"))?;
    Ok(Json(MessageBody::new("Course deleted successfully")))
}
