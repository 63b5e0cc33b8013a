//! Job Processor: resolve handler, invoke it, report the outcome back to
//! the Manager.
//!
//! Grounded on `kernel::jobs::worker::JobWorker::process_job`'s shape
//! (resolve → invoke → success/failure write-back), adapted to dispatch
//! through a type-erased [`HandlerRegistry`] instead of a single
//! hard-wired command handler trait.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::heartbeat::HeartbeatHandle;
use crate::job::Job;
use crate::manager::JobManager;
use crate::recorder::Recorder;
use crate::registry::HandlerRegistry;

/// Runs one claimed job end to end and reports the result to the
/// [`JobManager`]. Errors from the manager's write-back are logged and
/// swallowed — the next recovery cycle is the backstop.
pub struct JobProcessor {
    registry: Arc<HandlerRegistry>,
    manager: Arc<JobManager>,
    recorder: Arc<dyn Recorder>,
}

impl JobProcessor {
    pub fn new(registry: Arc<HandlerRegistry>, manager: Arc<JobManager>, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            registry,
            manager,
            recorder,
        }
    }

    /// Never propagates an error: any failure along the way is recorded
    /// on the job itself via `ProcessJobFailure`, and only a failure to
    /// even reach the manager is logged and dropped.
    pub async fn process(&self, job: Job, cancellation: CancellationToken) {
        if cancellation.is_cancelled() {
            tracing::debug!(job_id = %job.id, "processor: cancellation observed before start, skipping");
            return;
        }

        let started = std::time::Instant::now();
        let job_id = job.id;
        // `worker_id` is always set by the claim that put this job in the
        // channel; fall back to a fresh id only so a handler that never
        // calls `beat()` can't panic a caller that skips the claim step.
        let worker_id = job.worker_id.unwrap_or_else(Uuid::new_v4);
        let heartbeat = HeartbeatHandle::new(self.manager.clone(), job_id, worker_id);
        let outcome = self.registry.execute(job, cancellation, heartbeat).await;
        self.recorder.job_processed(job_id, started.elapsed());

        let write_back = match outcome {
            Ok(result) => self.manager.process_job_success(job_id, result).await,
            Err(job_error) => {
                self.manager
                    .process_job_failure(job_id, job_error.to_record())
                    .await
            }
        };

        if let Err(err) = write_back {
            tracing::warn!(job_id = %job_id, error = %err, "processor: manager write-back failed, recovery will reconcile");
        }
    }
}
