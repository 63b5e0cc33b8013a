//! The Job Claiming Service: one claim attempt, translated into the
//! four-way outcome the Producer's delay calculator keys on.

use std::sync::Arc;
use uuid::Uuid;

use crate::channel::ChannelEnqueuer;
use crate::manager::JobManager;

/// Result of one claim-then-enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    JobEnqueued,
    NoJobFound,
    FailedToEnqueue,
    ErrorOccurred,
}

/// Claims a single job via the [`JobManager`] and hands it to the
/// [`ChannelEnqueuer`], collapsing both steps into one outcome.
pub struct JobClaimingService {
    manager: Arc<JobManager>,
    enqueuer: Arc<ChannelEnqueuer>,
    worker_id: Uuid,
}

impl JobClaimingService {
    pub fn new(manager: Arc<JobManager>, enqueuer: Arc<ChannelEnqueuer>, worker_id: Uuid) -> Self {
        Self {
            manager,
            enqueuer,
            worker_id,
        }
    }

    /// Attempt one claim. Note on `FailedToEnqueue`: the job has already
    /// transitioned to `InProgress` in the store by the time the enqueue
    /// fails — recovery is what reclaims it after the lease timeout, this
    /// service does not roll the claim back.
    pub async fn claim_and_enqueue(&self) -> ClaimOutcome {
        let job = match self.manager.claim_next_available_job(self.worker_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return ClaimOutcome::NoJobFound,
            Err(err) => {
                tracing::warn!(error = %err, "job claiming service: claim failed");
                return ClaimOutcome::ErrorOccurred;
            }
        };

        if self.enqueuer.enqueue(job).await {
            ClaimOutcome::JobEnqueued
        } else {
            ClaimOutcome::FailedToEnqueue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelEnqueuer;
    use crate::clock::SystemClock;
    use crate::config::JobManagerConfig;
    use crate::manager::SubmitContext;
    use crate::recorder::NoopRecorder;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn no_job_found_when_store_is_empty() {
        let store: Arc<dyn crate::store::JobStore> = Arc::new(crate::tests_support::InMemoryTestStore::new());
        let manager = Arc::new(JobManager::new(
            store,
            Arc::new(SystemClock),
            Arc::new(NoopRecorder),
            JobManagerConfig::default(),
        ));
        let (tx, _rx) = mpsc::channel(4);
        let enqueuer = Arc::new(ChannelEnqueuer::new(tx, Duration::from_millis(50)));
        let service = JobClaimingService::new(manager, enqueuer, Uuid::new_v4());

        assert_eq!(service.claim_and_enqueue().await, ClaimOutcome::NoJobFound);
    }

    #[tokio::test]
    async fn claims_and_enqueues_a_submitted_job() {
        let store: Arc<dyn crate::store::JobStore> = Arc::new(crate::tests_support::InMemoryTestStore::new());
        let manager = Arc::new(JobManager::new(
            store,
            Arc::new(SystemClock),
            Arc::new(NoopRecorder),
            JobManagerConfig::default(),
        ));
        manager
            .submit_job("echo", "{}", SubmitContext::default())
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let enqueuer = Arc::new(ChannelEnqueuer::new(tx, Duration::from_millis(50)));
        let service = JobClaimingService::new(manager, enqueuer, Uuid::new_v4());

        assert_eq!(service.claim_and_enqueue().await, ClaimOutcome::JobEnqueued);
        let job = rx.recv().await.unwrap();
        assert_eq!(job.name, "echo");
    }

    #[tokio::test]
    async fn failed_to_enqueue_when_channel_has_no_room() {
        let store: Arc<dyn crate::store::JobStore> = Arc::new(crate::tests_support::InMemoryTestStore::new());
        let manager = Arc::new(JobManager::new(
            store,
            Arc::new(SystemClock),
            Arc::new(NoopRecorder),
            JobManagerConfig::default(),
        ));
        manager
            .submit_job("echo", "{}", SubmitContext::default())
            .await
            .unwrap();

        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(crate::job::Job::builder()
            .name("filler")
            .payload("{}")
            .created_at(chrono::Utc::now())
            .last_updated_at(chrono::Utc::now())
            .build())
            .unwrap();
        let enqueuer = Arc::new(ChannelEnqueuer::new(tx, Duration::from_millis(20)));
        let service = JobClaimingService::new(manager, enqueuer, Uuid::new_v4());

        assert_eq!(service.claim_and_enqueue().await, ClaimOutcome::FailedToEnqueue);
    }
}
