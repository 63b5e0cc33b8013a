//! Reference, single-process [`JobStore`](job_core::JobStore)
//! implementation: one mutex guarding an id map, no recovery.
//!
//! Takes the mutex, scans for the min-score eligible entry, atomically
//! replaces it, releases — in the style of `kernel::jobs`'s store-side
//! mutation bodies (load full record, mutate fields, persist whole
//! record back).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use job_core::{Job, JobStatus, JobStore, StoreError};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Single-process job store. Cloning the `Arc` this is normally wrapped
/// in is how multiple producers/consumers within one binary share it;
/// it has no way to coordinate with another process, hence
/// `supports_recovery() == false`.
#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
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

    async fn update_job(&self, mut job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        if !jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound { id: job.id });
        }
        job.last_updated_at = Utc::now();
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get_jobs_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .await
            .values()
            .filter(|job| job.status == status)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Holds the mutex for the whole read-eligibility-then-swap step, so
    /// two concurrent claimants can never both win the same job.
    /// Eligible entries are ordered by [`Job::ready_score`], ties
    /// broken lexicographically by id to keep selection deterministic.
    async fn claim_next_available_job(&self, worker_id: Uuid) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();

        let winner = jobs
            .values()
            .filter(|job| job.is_claimable(now))
            .min_by(|a, b| a.ready_score().cmp(&b.ready_score()).then_with(|| a.id.cmp(&b.id)))
            .map(|job| job.id);

        match winner {
            Some(id) => {
                let job = jobs.get_mut(&id).expect("winner id came from this map");
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

    /// Not measured against anything here — recovery is unsupported by
    /// this store, so there is no lease timeout a heartbeat is racing. Still
    /// enforces ownership, so a handle for a job this worker no longer
    /// holds gets a clear error rather than silently succeeding.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_job(now: DateTime<Utc>) -> Job {
        Job::builder()
            .name("echo")
            .payload("{}")
            .created_at(now)
            .last_updated_at(now)
            .build()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryStore::new();
        let job = sample_job(Utc::now());
        store.create_job(job.clone()).await.unwrap();
        let fetched = store.get_job_by_id(job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemoryStore::new();
        let job = sample_job(Utc::now());
        store.create_job(job.clone()).await.unwrap();
        let err = store.create_job(job).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn get_missing_job_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_job_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn claim_picks_earliest_eligible_and_marks_in_progress() {
        let store = InMemoryStore::new();
        let earlier = sample_job(Utc::now() - chrono::Duration::seconds(10));
        let later = sample_job(Utc::now());
        store.create_job(earlier.clone()).await.unwrap();
        store.create_job(later.clone()).await.unwrap();

        let worker_id = Uuid::new_v4();
        let claimed = store.claim_next_available_job(worker_id).await.unwrap().unwrap();
        assert_eq!(claimed.id, earlier.id);
        assert_eq!(claimed.status, JobStatus::InProgress);
        assert_eq!(claimed.worker_id, Some(worker_id));
        assert!(claimed.started_at.is_some());
    }

    #[tokio::test]
    async fn claim_returns_none_when_nothing_eligible() {
        let store = InMemoryStore::new();
        assert!(store.claim_next_available_job(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_claims_never_double_win_the_same_job() {
        let store = Arc::new(InMemoryStore::new());
        let job = sample_job(Utc::now());
        store.create_job(job.clone()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.claim_next_available_job(Uuid::new_v4()).await.unwrap()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1, "exactly one of the concurrent claimants should win the single job");
    }

    #[tokio::test]
    async fn recovery_is_unsupported() {
        let store = InMemoryStore::new();
        assert!(!store.supports_recovery());
        let err = store
            .recover_stuck_jobs(Utc::now(), 3, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RecoveryUnsupported));
    }

    #[tokio::test]
    async fn heartbeat_extends_the_lease_of_the_owning_worker() {
        let store = InMemoryStore::new();
        let job = sample_job(Utc::now());
        store.create_job(job.clone()).await.unwrap();
        let worker_id = Uuid::new_v4();
        let claimed = store.claim_next_available_job(worker_id).await.unwrap().unwrap();

        store.heartbeat(claimed.id, worker_id).await.unwrap();

        let refreshed = store.get_job_by_id(claimed.id).await.unwrap();
        assert!(refreshed.started_at.unwrap() >= claimed.started_at.unwrap());
    }

    #[tokio::test]
    async fn heartbeat_from_the_wrong_worker_is_rejected() {
        let store = InMemoryStore::new();
        let job = sample_job(Utc::now());
        store.create_job(job.clone()).await.unwrap();
        let claimed = store.claim_next_available_job(Uuid::new_v4()).await.unwrap().unwrap();

        let err = store.heartbeat(claimed.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn update_bumps_last_updated_at() {
        let store = InMemoryStore::new();
        let job = sample_job(Utc::now() - chrono::Duration::seconds(5));
        let original_updated_at = job.last_updated_at;
        store.create_job(job.clone()).await.unwrap();

        let mut updated = job;
        updated.status = JobStatus::Canceled;
        store.update_job(updated.clone()).await.unwrap();

        let fetched = store.get_job_by_id(updated.id).await.unwrap();
        assert!(fetched.last_updated_at >= original_updated_at);
        assert_eq!(fetched.status, JobStatus::Canceled);
    }
}
