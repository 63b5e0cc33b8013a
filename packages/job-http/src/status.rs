//! Status endpoint: `GET {path}/{id}` → 200 + snapshot, or
//! 404 if the job doesn't exist.

use std::sync::Arc;

use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use axum::Json;
use job_core::{JobManager, StoreError};
use uuid::Uuid;

use crate::error::ApiError;
use crate::snapshot::JobSnapshot;

pub async fn handle(manager: Arc<JobManager>, Path(id): Path<Uuid>) -> Response {
    match manager.get_job_by_id(id).await {
        Ok(job) => Json(JobSnapshot::from(&job)).into_response(),
        Err(StoreError::NotFound { id }) => ApiError::not_found(format!("job {id} not found")).into_response(),
        Err(other) => ApiError::from(other).into_response(),
    }
}
