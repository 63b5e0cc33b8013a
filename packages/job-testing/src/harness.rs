//! An in-memory job-manager bundle for integration-style tests that
//! don't need Redis.
//!
//! Grounded on `kernel::jobs::manager::TestJobManager`'s pattern of
//! wrapping a real manager over a throwaway store behind a single
//! test-only constructor, so call sites don't repeat the
//! `Arc::new(JobManager::new(...))` boilerplate in every test module.

use std::sync::Arc;

use job_core::{JobManager, JobManagerConfig, NoopRecorder};
use job_memory::InMemoryStore;

use crate::clock::FakeClock;

/// Bundles a [`JobManager`] over a fresh [`InMemoryStore`] and a
/// [`FakeClock`] the test can move by hand. The store and clock stay
/// reachable so a test can assert on raw store state or advance time
/// past a retry delay without going through the manager.
pub struct TestJobManager {
    pub manager: Arc<JobManager>,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FakeClock>,
}

impl TestJobManager {
    pub fn new() -> Self {
        Self::with_config(JobManagerConfig::default())
    }

    pub fn with_config(config: JobManagerConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FakeClock::starting_now());
        let manager = Arc::new(JobManager::new(
            store.clone(),
            clock.clone(),
            Arc::new(NoopRecorder),
            config,
        ));
        Self { manager, store, clock }
    }
}

impl Default for TestJobManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_core::{JobStatus, SubmitContext};

    #[tokio::test]
    async fn submit_and_claim_round_trip_through_the_real_manager() {
        let harness = TestJobManager::new();
        let submitted = harness
            .manager
            .submit_job("echo", "{}", SubmitContext::default())
            .await
            .unwrap();
        assert_eq!(submitted.status, JobStatus::Queued);

        let claimed = harness
            .manager
            .claim_next_available_job(uuid::Uuid::new_v4())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, submitted.id);
        assert_eq!(claimed.status, JobStatus::InProgress);
    }

    /// The store itself always checks eligibility against real wall-clock
    /// time (store implementations read `Utc::now()` directly, not an
    /// injected clock — only the *manager* threads `Clock` through, for
    /// the timestamps it writes). So advancing [`FakeClock`] doesn't make
    /// an in-memory store reclaim a job early; what it does let a test
    /// control deterministically is the `retry_delay_until` value the
    /// manager computes and records. This test checks that computation
    /// directly via [`job_core::Job::is_claimable`] rather than racing a
    /// real store against a fake clock.
    #[tokio::test]
    async fn clock_advance_reveals_retry_eligibility_on_the_record() {
        let harness = TestJobManager::new();
        let submitted = harness
            .manager
            .submit_job("flaky", "{}", SubmitContext::default())
            .await
            .unwrap();
        harness
            .manager
            .claim_next_available_job(uuid::Uuid::new_v4())
            .await
            .unwrap();
        let retried = harness
            .manager
            .process_job_failure(submitted.id, job_core::JobErrorRecord::new("E", "x"))
            .await
            .unwrap();

        assert!(!retried.is_claimable(harness.clock.now()));
        harness.clock.advance(chrono::Duration::seconds(60));
        assert!(retried.is_claimable(harness.clock.now()));
    }
}
