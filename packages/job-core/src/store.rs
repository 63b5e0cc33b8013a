//! The [`JobStore`] trait: the durable-storage contract every backend
//! (in-memory, Redis, ...) implements.
//!
//! Grounded on `seesaw::job::JobStore` (claim + mark succeeded/failed +
//! heartbeat) generalized with a full CRUD and recovery surface, and on
//! `kernel::jobs::queue::JobQueue`'s split between "claim" and
//! "mark_succeeded/mark_failed" for the mutation shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::job::{Job, JobStatus};

/// Durable CRUD plus atomic claim and recovery scan.
///
/// Implementations must guarantee at most one claim winner per job, and
/// must keep the ready index consistent with `status`/`worker_id`/
/// `retry_delay_until` on every mutating call — a caller never has to
/// re-index a job by hand.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a brand new job. Fails with `Duplicate` if `id` already
    /// exists. Indexes the job for claiming iff its status is `Queued`.
    async fn create_job(&self, job: Job) -> Result<(), StoreError>;

    /// Fetch a job snapshot by id, or `NotFound`.
    async fn get_job_by_id(&self, id: Uuid) -> Result<Job, StoreError>;

    /// Replace a job record wholesale. Refreshes the ready index
    /// according to the new status and bumps `last_updated_at`.
    async fn update_job(&self, job: Job) -> Result<(), StoreError>;

    /// Bounded scan of jobs currently in `status`.
    async fn get_jobs_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Atomically claim the single earliest eligible job for
    /// `worker_id`, transitioning it to `InProgress`. Returns `None` if no
    /// job is currently eligible.
    async fn claim_next_available_job(&self, worker_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Scan `InProgress` jobs whose `started_at <= timeout_instant` and
    /// reclaim them: retry if under `max_retries`, otherwise terminal
    /// `Failed`. Returns the count recovered.
    ///
    /// Stores that don't support recovery (`supports_recovery() == false`)
    /// must reject this with [`StoreError::RecoveryUnsupported`].
    async fn recover_stuck_jobs(
        &self,
        timeout_instant: DateTime<Utc>,
        max_retries: u32,
        retry_base_seconds: u64,
    ) -> Result<u64, StoreError>;

    /// Whether this backend implements [`JobStore::recover_stuck_jobs`].
    /// Gates whether the recovery background task runs at all.
    fn supports_recovery(&self) -> bool;

    /// Extend `worker_id`'s lease on `id` by bumping the timestamp
    /// [`JobStore::recover_stuck_jobs`] measures staleness against, so a
    /// long-running handler that calls this periodically is not reclaimed
    /// out from under itself. Fails with `Invalid` if the job is not
    /// `InProgress` under `worker_id`, or `NotFound` if it no longer exists.
    async fn heartbeat(&self, id: Uuid, worker_id: Uuid) -> Result<(), StoreError>;
}
