//! Shared test-only in-memory [`JobStore`] used by unit tests across this
//! crate that need a real (if minimal) store rather than a mock. The
//! fuller reference implementation lives in the separate `job-memory`
//! crate; this one stays here to avoid an internal crate depending on
//! one of its own consumers.
#![cfg(test)]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::job::{Job, JobStatus};
use crate::store::JobStore;

pub struct InMemoryTestStore {
    pub jobs: Mutex<HashMap<Uuid, Job>>,
}

impl InMemoryTestStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl JobStore for InMemoryTestStore {
    async fn create_job(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate { id: job.id });
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get_job_by_id(&self, id: Uuid) -> Result<Job, StoreError> {
        self.jobs
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    async fn update_job(&self, job: Job) -> Result<(), StoreError> {
        self.jobs.lock().await.insert(job.id, job);
        Ok(())
    }

    async fn get_jobs_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .await
            .values()
            .filter(|j| j.status == status)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn claim_next_available_job(&self, worker_id: Uuid) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();
        let candidate = jobs
            .values()
            .filter(|j| j.is_claimable(now))
            .min_by_key(|j| j.ready_score())
            .map(|j| j.id);
        match candidate {
            Some(id) => {
                let job = jobs.get_mut(&id).unwrap();
                job.status = JobStatus::InProgress;
                job.worker_id = Some(worker_id);
                job.started_at = Some(now);
                job.last_updated_at = now;
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn recover_stuck_jobs(
        &self,
        _timeout_instant: DateTime<Utc>,
        _max_retries: u32,
        _retry_base_seconds: u64,
    ) -> Result<u64, StoreError> {
        Err(StoreError::RecoveryUnsupported)
    }

    fn supports_recovery(&self) -> bool {
        false
    }

    async fn heartbeat(&self, id: Uuid, worker_id: Uuid) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound { id })?;
        if job.status != JobStatus::InProgress || job.worker_id != Some(worker_id) {
            return Err(StoreError::Invalid(format!(
                "job {id} is not InProgress under worker {worker_id}"
            )));
        }
        let now = Utc::now();
        job.started_at = Some(now);
        job.last_updated_at = now;
        Ok(())
    }
}
