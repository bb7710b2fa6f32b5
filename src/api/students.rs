use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::error::{failed, record_id, ApiError, MessageBody};
use super::AppState;
use crate::models::{Student, StudentInput, StudentPatch};
use crate::service::students;

const RESOURCE: &str = "Student";

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route(
            "/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, ApiError> {
    let rows = state
        .store
        .run(students::list)
        .await
        .map_err(failed("Error fetching students"))?;
    Ok(Json(rows))
}

async fn get_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Student>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    let student = state
        .store
        .run(move |conn| students::get(conn, id))
        .await
        .map_err(failed("Error fetching student"))?;
    Ok(Json(student))
}

async fn create_student(
    State(state): State<AppState>,
    payload: Result<Json<StudentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let Json(input) = payload?;
    let student = state
        .store
        .run(move |conn| students::create(conn, input))
        .await
        .map_err(failed("Error creating student"))?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn update_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StudentPatch>, JsonRejection>,
) -> Result<Json<Student>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    let Json(patch) = payload?;
    let student = state
        .store
        .run(move |conn| students::update(conn, id, patch))
        .await
        .map_err(failed("Error updating student"))?;
    Ok(Json(student))
}

async fn delete_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = record_id(id, RESOURCE)?;
    state
        .store
        .run(move |conn| students::delete(conn, id))
        .await
        .map_err(failed("Error deleting student"))?;
    Ok(Json(MessageBody::new("Student deleted successfully")))
}
