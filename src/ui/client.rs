//! Blocking API client for the TUI. Requests are real HTTP requests, but they
//! are dispatched straight into the router instead of over a socket.

use anyhow::{anyhow, Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tower::ServiceExt;

use crate::api::MessageBody;
use crate::models::{
    Course, CourseInput, CoursePatch, Enrollment, EnrollmentDetail, EnrollmentInput, Student,
    StudentInput, StudentPatch,
};

pub struct ApiClient {
    router: Router,
    runtime: Handle,
}

impl ApiClient {
    /// `runtime` must belong to a multi-threaded runtime that is not driving
    /// the calling thread; the client blocks on it for every request.
    pub fn new(router: Router, runtime: Handle) -> Self {
        Self { router, runtime }
    }

    pub fn list_students(&self) -> Result<Vec<Student>> {
        self.send(Method::GET, "/api/students", None::<&()>)
    }

    pub fn create_student(&self, input: &StudentInput) -> Result<Student> {
        self.send(Method::POST, "/api/students", Some(input))
    }

    pub fn update_student(&self, id: i64, patch: &StudentPatch) -> Result<Student> {
        self.send(Method::PUT, &format!("/api/students/{id}"), Some(patch))
    }

    pub fn delete_student(&self, id: i64) -> Result<MessageBody> {
        self.send(Method::DELETE, &format!("/api/students/{id}"), None::<&()>)
    }

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        self.send(Method::GET, "/api/courses", None::<&()>)
    }

    pub fn create_course(&self, input: &CourseInput) -> Result<Course> {
        self.send(Method::POST, "/api/courses", Some(input))
    }

    pub fn update_course(&self, id: i64, patch: &CoursePatch) -> Result<Course> {
        self.send(Method::PUT, &format!("/api/courses/{id}"), Some(patch))
    }

    pub fn delete_course(&self, id: i64) -> Result<MessageBody> {
        self.send(Method::DELETE, &format!("/api/courses/{id}"), None::<&()>)
    }

    pub fn list_enrollments(&self) -> Result<Vec<EnrollmentDetail>> {
        self.send(Method::GET, "/api/enrollments", None::<&()>)
    }

    pub fn create_enrollment(&self, input: &EnrollmentInput) -> Result<Enrollment> {
        self.send(Method::POST, "/api/enrollments", Some(input))
    }

    pub fn delete_enrollment(&self, id: i64) -> Result<MessageBody> {
        self.send(Method::DELETE, &format!("/api/enrollments/{id}"), None::<&()>)
    }

    /// Issue one request and decode the body. A non-2xx status becomes an
    /// error carrying the API's `message`.
    fn send<B, T>(&self, method: Method, uri: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = match body {
            Some(payload) => {
                Body::from(serde_json::to_vec(payload).context("failed to encode request")?)
            }
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .context("failed to build request")?;

        let router = self.router.clone();
        let (status, bytes) = self.runtime.block_on(async move {
            let response = router.oneshot(request).await?;
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .context("failed to read response body")?;
            Ok::<_, anyhow::Error>((status, bytes))
        })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<MessageBody>(&bytes)
                .map(|body| body.message)
                .unwrap_or_else(|_| format!("Request failed with status {status}"));
            return Err(anyhow!(message));
        }

        serde_json::from_slice(&bytes).context("failed to decode response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::db::Store;

    fn client() -> (tokio::runtime::Runtime, ApiClient) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let router = api::router(Store::open_in_memory().unwrap());
        let client = ApiClient::new(router, runtime.handle().clone());
        (runtime, client)
    }

    #[test]
    fn create_then_list_students() {
        let (_runtime, client) = client();
        let created = client
            .create_student(&StudentInput {
                name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
                ..Default::default()
            })
            .unwrap();

        let listed = client.list_students().unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[test]
    fn api_errors_surface_their_message() {
        let (_runtime, client) = client();
        let err = client.create_course(&CourseInput::default()).unwrap_err();
        assert_eq!(err.to_string(), "Course name is required");

        let err = client.delete_enrollment(12).unwrap_err();
        assert_eq!(err.to_string(), "Enrollment not found");
    }
}
