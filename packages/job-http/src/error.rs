//! Minimal error taxonomy presentation for the HTTP boundary.
//!
//! Response-body formatting and error taxonomy presentation are treated
//! as an external collaborator's concern — this is a reasonable default
//! shape, not the only legal one; a host app can bypass it entirely by
//! building its own handlers over [`crate::state::JobHttpState`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// An HTTP-shaped error: a status code plus a short message. Submit's
/// body-parse failures map to 400, status lookups on a missing job map
/// to 404, and anything else the store surfaces maps to 500.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(status = %self.status, message = %self.message, "job-http: returning error response");
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Maps a [`job_core::StoreError`] the submit/status handlers didn't
/// already special-case (`Duplicate`, `NotFound`) onto a 500 — anything
/// reaching here is an infrastructure failure, not a client mistake.
impl From<job_core::StoreError> for ApiError {
    fn from(err: job_core::StoreError) -> Self {
        match err {
            job_core::StoreError::NotFound { id } => ApiError::not_found(format!("job {id} not found")),
            job_core::StoreError::Invalid(message) => ApiError::bad_request(message),
            other => ApiError::internal(other.to_string()),
        }
    }
}
