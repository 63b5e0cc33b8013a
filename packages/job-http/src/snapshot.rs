//! The job snapshot response body: the wire shape returned by
//! both the submit acknowledgement and the status endpoint.

use chrono::{DateTime, Utc};
use job_core::{Job, JobErrorRecord};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
    pub result: Option<String>,
    pub error: Option<JobErrorRecord>,
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            status: job.status.to_string(),
            retry_count: job.retry_count,
            max_retries: job.max_retries,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            last_updated_at: job.last_updated_at,
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }
}

impl From<Job> for JobSnapshot {
    fn from(job: Job) -> Self {
        Self::from(&job)
    }
}
