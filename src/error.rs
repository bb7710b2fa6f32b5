//! Error kinds shared by the store, the services, and the API surface.

use thiserror::Error;

/// Every failure a record operation can produce. The variants are kept
/// coarse because the HTTP layer only needs to pick a status code and a
/// message; anything that is not a client mistake ends up in `Store`.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A required field was missing or blank.
    #[error("{0}")]
    Validation(String),
    /// The referenced record does not exist. Carries the resource name
    /// ("Student", "Course", "Enrollment").
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The write would break a uniqueness rule.
    #[error("{0}")]
    Conflict(String),
    /// Anything else raised by the persistence layer.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl RecordError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type Result<T, E = RecordError> = std::result::Result<T, E>;
