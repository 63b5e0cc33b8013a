//! Observability seam decoupled from any concrete metrics backend.
//!
//! Grounded on `seesaw::tap::SpanCollector`, which keeps its core state
//! machine free of a hard dependency on a specific telemetry sink by
//! routing everything through a small collaborator trait with a no-op
//! default. This crate draws the same seam around job lifecycle events
//! instead of spans.

use std::time::Duration;

use uuid::Uuid;

/// Notified of job lifecycle transitions. Implementations decide what
/// (if anything) to do with them — emit metrics, log, push to a bus.
/// The core never depends on a concrete backend; `demos/echo-server`
/// wires in whatever it wants at composition time.
pub trait Recorder: Send + Sync {
    fn job_enqueued(&self, _job_id: Uuid, _job_name: &str) {}
    /// A submit landed on an id that already existed — the existing job
    /// was returned instead of a new one being created.
    fn job_submit_deduplicated(&self, _job_id: Uuid) {}
    fn job_claimed(&self, _job_id: Uuid, _worker_id: Uuid) {}
    /// A handler extended its own lease via a `HeartbeatHandle`.
    fn job_heartbeat(&self, _job_id: Uuid, _worker_id: Uuid) {}
    /// Wall-clock time spent inside the handler invocation itself, distinct
    /// from `job_succeeded`'s end-to-end duration since claim.
    fn job_processed(&self, _job_id: Uuid, _handler_duration: Duration) {}
    fn job_succeeded(&self, _job_id: Uuid, _duration: Duration) {}
    fn job_failed(&self, _job_id: Uuid, _retry_count: u32, _will_retry: bool) {}
    fn job_recovered(&self, _job_id: Uuid) {}
    fn recovery_scan_completed(&self, _recovered_count: u64) {}
}

/// Does nothing. The default when a caller doesn't care to observe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {}

/// Forwards every event to `tracing` at a sensible level. A reasonable
/// default for services that want visibility without wiring a real
/// metrics sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn job_enqueued(&self, job_id: Uuid, job_name: &str) {
        tracing::debug!(%job_id, job_name, "job enqueued");
    }

    fn job_submit_deduplicated(&self, job_id: Uuid) {
        tracing::debug!(%job_id, "submit deduplicated against an existing job");
    }

    fn job_claimed(&self, job_id: Uuid, worker_id: Uuid) {
        tracing::debug!(%job_id, %worker_id, "job claimed");
    }

    fn job_heartbeat(&self, job_id: Uuid, worker_id: Uuid) {
        tracing::trace!(%job_id, %worker_id, "job lease extended");
    }

    fn job_processed(&self, job_id: Uuid, handler_duration: Duration) {
        tracing::debug!(%job_id, handler_duration_ms = handler_duration.as_millis() as u64, "handler invocation finished");
    }

    fn job_succeeded(&self, job_id: Uuid, duration: Duration) {
        tracing::info!(%job_id, duration_ms = duration.as_millis() as u64, "job succeeded");
    }

    fn job_failed(&self, job_id: Uuid, retry_count: u32, will_retry: bool) {
        tracing::warn!(%job_id, retry_count, will_retry, "job failed");
    }

    fn job_recovered(&self, job_id: Uuid) {
        tracing::warn!(%job_id, "job recovered from stuck in-progress state");
    }

    fn recovery_scan_completed(&self, recovered_count: u64) {
        if recovered_count > 0 {
            tracing::info!(recovered_count, "recovery scan reclaimed stuck jobs");
        }
    }
}
