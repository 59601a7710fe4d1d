use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Poll not found: {0}")]
    NotFound(String),

    #[error("Poll is closed: {0}")]
    PollClosed(String),

    #[error("You have already voted on this poll")]
    Conflict,

    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("{0}")]
    PayloadTooLarge(String),
}

impl PollError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PollError::InvalidInput(msg.into())
    }

    /// Only transient failures may be retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, PollError::Transient(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PollError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PollError::NotFound(_) => StatusCode::NOT_FOUND,
            PollError::PollClosed(_) => StatusCode::GONE,
            PollError::Conflict => StatusCode::CONFLICT,
            PollError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            PollError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<StoreError> for PollError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyVoted => PollError::Conflict,
            StoreError::Unavailable(msg) => PollError::Transient(msg),
        }
    }
}

/// A body over the size limit keeps its 413; every other JSON failure is
/// invalid input.
impl From<JsonRejection> for PollError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::BytesRejection(e)
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                PollError::PayloadTooLarge(e.body_text())
            }
            other => PollError::InvalidInput(other.body_text()),
        }
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
