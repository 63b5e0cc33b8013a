//! Structured error kinds for the store and processor layers.
//!
//! Mirrors the split drawn elsewhere in this codebase between `anyhow`
//! (internal transport, ergonomic for callers that only want to propagate) and
//! `thiserror` (pattern-matchable errors at a boundary other components
//! need to branch on). `StoreError` is that boundary for the job store;
//! `JobError` is that boundary for the processor.

use uuid::Uuid;

use crate::job::JobErrorRecord;

/// Errors a [`crate::store::JobStore`] implementation can return.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {id} already exists")]
    Duplicate { id: Uuid },

    #[error("job {id} not found")]
    NotFound { id: Uuid },

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] anyhow::Error),

    #[error("this store does not support recovery")]
    RecoveryUnsupported,
}

/// Errors surfaced by the [`crate::processor::JobProcessor`] while
/// resolving and running a handler. These are converted to
/// [`JobErrorRecord`]s and handed to the manager's failure path; they
/// never escape the consumer worker loop.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("no handler registered for job type {job_name}")]
    HandlerNotFound { job_name: String },

    #[error("failed to deserialize payload for job type {job_name}: {message}")]
    DeserializationFailed { job_name: String, message: String },

    #[error("handler returned error {code}: {message}")]
    HandlerError { code: String, message: String },

    #[error("handler threw: {message}")]
    HandlerException {
        message: String,
        exception: Option<String>,
    },
}

/// Heuristic classification of a bare `anyhow::Error` into a retryable
/// or non-retryable [`JobError`], for handlers that don't bother
/// constructing a structured [`JobError::HandlerError`] themselves.
/// Grounded on `kernel::jobs::runner::classify_error`'s keyword-matching
/// approach; used by [`crate::registry::HandlerRegistry::register_fallible`].
pub fn classify_error(error: &anyhow::Error) -> JobError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    let code = if lower.contains("not found")
        || lower.contains("invalid")
        || lower.contains("permission denied")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("deserialize")
        || lower.contains("parse")
    {
        "NonRetryable"
    } else {
        "Retryable"
    };
    JobError::HandlerError {
        code: code.to_string(),
        message,
    }
}

impl JobError {
    /// Whether this error kind should count against the job's retry budget
    /// the normal way, or is a structural problem with the request itself.
    /// Every variant here is currently converted to a job failure the same
    /// way and goes through the normal retry path, but the distinction is
    /// kept so a future variant can opt out.
    pub fn to_record(&self) -> JobErrorRecord {
        match self {
            JobError::HandlerNotFound { job_name } => JobErrorRecord::new(
                "HandlerNotFound",
                format!("no handler registered for job type {job_name}"),
            ),
            JobError::DeserializationFailed { job_name, message } => JobErrorRecord::new(
                "DeserializationFailed",
                format!("failed to deserialize payload for job type {job_name}: {message}"),
            ),
            JobError::HandlerError { code, message } => {
                JobErrorRecord::new(code.clone(), message.clone())
            }
            JobError::HandlerException { message, exception } => {
                let record = JobErrorRecord::new("HandlerException", message.clone());
                match exception {
                    Some(exception) => record.with_exception(exception.clone()),
                    None => record,
                }
            }
        }
    }
}
