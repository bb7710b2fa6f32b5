//! Conversion from record errors to HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::RecordError;

/// The only body shape the API uses for errors and delete confirmations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Pick the status for a record error. Store failures are logged here
    /// with the full chain and reach the client only as `action`.
    pub fn from_record(err: RecordError, action: &'static str) -> Self {
        match err {
            RecordError::Validation(message) | RecordError::Conflict(message) => {
                Self::new(StatusCode::BAD_REQUEST, message)
            }
            not_found @ RecordError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, not_found.to_string())
            }
            RecordError::Store(err) => {
                error!(action, error = %format!("{err:#}"), "store operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, action)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageBody::new(self.message))).into_response()
    }
}

/// Handler-side shorthand: `.map_err(failed("Error fetching students"))`.
pub fn failed(action: &'static str) -> impl FnOnce(RecordError) -> ApiError {
    move |err| ApiError::from_record(err, action)
}

/// A path id that does not parse can never match a row, so it reads as
/// not-found rather than as a malformed request.
pub fn record_id(
    path: Result<Path<i64>, PathRejection>,
    resource: &'static str,
) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            RecordError::NotFound(resource).to_string(),
        )
    })
}
