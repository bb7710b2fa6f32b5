//! End-to-end checks of the HTTP surface, driven in-process through the router.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use school_records::api;
use school_records::db::Store;

fn app() -> Router {
    api::router(Store::open_in_memory().unwrap())
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_student(router: &Router, name: &str, email: &str) -> i64 {
    let (status, body) = call(
        router,
        Method::POST,
        "/api/students",
        Some(json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn create_course(router: &Router, name: &str) -> i64 {
    let (status, body) = call(
        router,
        Method::POST,
        "/api/courses",
        Some(json!({ "name": name, "credits": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let router = app();
    let (status, body) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn student_crud_round_trip() {
    let router = app();
    let (status, created) = call(
        &router,
        Method::POST,
        "/api/students",
        Some(json!({ "name": "  Ada Lovelace ", "email": "ada@example.com", "phone": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Ada Lovelace");
    assert_eq!(created["phone"], Value::Null);
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = call(&router, Method::GET, &format!("/api/students/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = call(
        &router,
        Method::PUT,
        &format!("/api/students/{id}"),
        Some(json!({ "address": "12 St James's Square" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ada Lovelace");
    assert_eq!(updated["address"], "12 St James's Square");

    let (status, body) = call(&router, Method::DELETE, &format!("/api/students/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Student deleted successfully" }));

    let (status, body) = call(&router, Method::GET, &format!("/api/students/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Student not found" }));
}

#[tokio::test]
async fn missing_required_fields_are_rejected() {
    let router = app();
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/students",
        Some(json!({ "name": "Ada", "email": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name and email are required");

    let (status, body) = call(&router, Method::POST, "/api/courses", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Course name is required");

    let (status, body) = call(&router, Method::POST, "/api/enrollments", Some(json!({ "student_id": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Student ID and Course ID are required");
}

#[tokio::test]
async fn lists_are_newest_first() {
    let router = app();
    create_course(&router, "Algebra").await;
    create_course(&router, "Biology").await;

    let (status, body) = call(&router, Method::GET, "/api/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|course| course["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Biology", "Algebra"]);
}

#[tokio::test]
async fn enrollment_rules_are_enforced() {
    let router = app();
    let student = create_student(&router, "Ada", "ada@example.com").await;
    let course = create_course(&router, "Algebra").await;

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/enrollments",
        Some(json!({ "student_id": student + 100, "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found");

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/enrollments",
        Some(json!({ "student_id": student, "course_id": course + 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Course not found");

    let payload = json!({ "student_id": student, "course_id": course });
    let (status, created) = call(&router, Method::POST, "/api/enrollments", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["student_id"], student);
    assert_eq!(created["course_id"], course);

    let (status, body) = call(&router, Method::POST, "/api/enrollments", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Student already enrolled in this course");

    let (status, listed) = call(&router, Method::GET, "/api/enrollments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["student"]["name"], "Ada");
    assert_eq!(listed[0]["course"]["name"], "Algebra");
    assert_eq!(listed[0]["course"]["credits"], 3);
}

#[tokio::test]
async fn deleting_a_course_removes_its_enrollments() {
    let router = app();
    let student = create_student(&router, "Ada", "ada@example.com").await;
    let course = create_course(&router, "Algebra").await;
    let (status, _) = call(
        &router,
        Method::POST,
        "/api/enrollments",
        Some(json!({ "student_id": student, "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&router, Method::DELETE, &format!("/api/courses/{course}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Course deleted successfully");

    let (_, listed) = call(&router, Method::GET, "/api/enrollments", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn enrollments_cannot_be_updated() {
    let router = app();
    let (status, _) = call(&router, Method::PUT, "/api/enrollments/1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn bad_ids_and_bodies_get_json_errors() {
    let router = app();
    let (status, body) = call(&router, Method::GET, "/api/students/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found");

    let (status, body) = call(&router, Method::DELETE, "/api/enrollments/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Enrollment not found");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/courses")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\":"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn null_clears_optional_fields_and_absent_keeps_them() {
    let router = app();
    let course = create_course(&router, "Algebra").await;

    let (status, updated) = call(
        &router,
        Method::PUT,
        &format!("/api/courses/{course}"),
        Some(json!({ "instructor": "Noether" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["credits"], 3);

    let (status, updated) = call(
        &router,
        Method::PUT,
        &format!("/api/courses/{course}"),
        Some(json!({ "credits": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["credits"], Value::Null);
    assert_eq!(updated["instructor"], "Noether");

    let (status, created) = call(
        &router,
        Method::POST,
        "/api/students",
        Some(json!({ "name": "Ada", "email": "ada@example.com", "phone": "555-0100" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let student = created["id"].as_i64().unwrap();

    let (status, updated) = call(
        &router,
        Method::PUT,
        &format!("/api/students/{student}"),
        Some(json!({ "phone": null, "name": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], Value::Null);
    assert_eq!(updated["name"], "Ada");
}
