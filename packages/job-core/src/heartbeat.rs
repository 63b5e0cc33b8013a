//! Handle a handler can use to extend its own lease mid-flight.
//!
//! Grounded on `kernel::jobs::worker::JobWorker::execute_with_heartbeat`'s
//! periodic-renewal pattern: a long-running handler calls `beat()` from
//! inside its own loop on whatever cadence it chooses, rather than this
//! crate polling the handler from the outside.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::manager::JobManager;

/// Passed into every handler invocation alongside the claimed `Job` and
/// its cancellation token. Cheap to clone and hold across `.await`
/// points; every call reads through to the store.
#[derive(Clone)]
pub struct HeartbeatHandle {
    manager: Arc<JobManager>,
    job_id: Uuid,
    worker_id: Uuid,
}

impl HeartbeatHandle {
    /// Normally built once per job by [`crate::processor::JobProcessor`]
    /// right before dispatching to the registry; exposed publicly so
    /// handler unit tests elsewhere can construct one without routing
    /// through the whole pipeline.
    pub fn new(manager: Arc<JobManager>, job_id: Uuid, worker_id: Uuid) -> Self {
        Self {
            manager,
            job_id,
            worker_id,
        }
    }

    /// Extend the lease now. Handlers expected to run close to (or past)
    /// the configured recovery timeout should call this periodically
    /// rather than once up front.
    pub async fn beat(&self) -> Result<(), StoreError> {
        self.manager.heartbeat(self.job_id, self.worker_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::JobManagerConfig;
    use crate::job::JobStatus;
    use crate::manager::SubmitContext;
    use crate::recorder::NoopRecorder;
    use crate::tests_support::InMemoryTestStore;

    #[tokio::test]
    async fn beat_extends_the_lease_of_the_owning_worker() {
        let store = Arc::new(InMemoryTestStore::new());
        let manager = Arc::new(JobManager::new(
            store,
            Arc::new(SystemClock),
            Arc::new(NoopRecorder),
            JobManagerConfig::default(),
        ));
        let job = manager
            .submit_job("echo", "{}", SubmitContext::default())
            .await
            .unwrap();
        let worker_id = Uuid::new_v4();
        let claimed = manager.claim_next_available_job(worker_id).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);

        let handle = HeartbeatHandle::new(manager.clone(), job.id, worker_id);
        handle.beat().await.unwrap();

        let refreshed = manager.get_job_by_id(job.id).await.unwrap();
        assert_eq!(refreshed.status, JobStatus::InProgress);
    }

    #[tokio::test]
    async fn beat_from_the_wrong_worker_is_rejected() {
        let store = Arc::new(InMemoryTestStore::new());
        let manager = Arc::new(JobManager::new(
            store,
            Arc::new(SystemClock),
            Arc::new(NoopRecorder),
            JobManagerConfig::default(),
        ));
        let job = manager
            .submit_job("echo", "{}", SubmitContext::default())
            .await
            .unwrap();
        manager.claim_next_available_job(Uuid::new_v4()).await.unwrap();

        let handle = HeartbeatHandle::new(manager, job.id, Uuid::new_v4());
        assert!(handle.beat().await.is_err());
    }
}
