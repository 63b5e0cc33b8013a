//! HTTP glue for `job-core`: turns an incoming request into
//! a submitted job, and exposes a status lookup by job id. Everything
//! here is optional sugar over [`job_core::JobManager`] — a host app is
//! free to write its own handlers against the same manager instead.

pub mod error;
pub mod router;
pub mod snapshot;
pub mod state;
pub mod status;
pub mod submit;

pub use error::ApiError;
pub use router::job_router;
pub use snapshot::JobSnapshot;
pub use state::JobHttpState;
pub use submit::{SubmitRoute, IDEMPOTENCY_HEADER};
