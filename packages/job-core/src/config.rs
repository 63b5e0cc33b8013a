//! Typed configuration for the worker pipeline, job manager and recovery
//! loop.
//!
//! Grounded on `kernel::jobs::worker::JobWorkerConfig`'s `Default` impl
//! (field-per-tunable with sensible defaults, built with `TypedBuilder`)
//! and `server::config::Config::from_env`'s convention of naming env
//! vars after the dotted config keys with an uppercase-snake transform —
//! that env-loading piece lives in `demos/echo-server`, not here, since
//! this crate has no opinion about where its config comes from.

use std::time::Duration;

use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Tunables for the producer/consumer pipeline.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct WorkerConfig {
    /// `worker.workerId` — per-process identifier used when claiming jobs.
    #[builder(default = Uuid::new_v4())]
    pub worker_id: Uuid,

    /// `worker.maximumConcurrency` — consumer pool size / semaphore capacity.
    #[builder(default = num_cpus())]
    pub maximum_concurrency: usize,

    /// `worker.maximumQueueSize` — bounded channel capacity.
    #[builder(default = 50)]
    pub maximum_queue_size: usize,

    /// `worker.pollingIntervalMs` — base delay used by the Delay Calculator.
    #[builder(default = Duration::from_millis(1000))]
    pub polling_interval: Duration,

    /// `worker.channelWriteTimeoutSeconds` — bound on the Channel Enqueuer's
    /// blocking-write fallback.
    #[builder(default = Duration::from_secs(5))]
    pub channel_write_timeout: Duration,

    /// `worker.errorDelaySeconds` — fixed delay after `ErrorOccurred`.
    #[builder(default = Duration::from_secs(5))]
    pub error_delay: Duration,

    /// `worker.maxDelayMs` — cap on the `NoJobFound` back-off.
    #[builder(default = Duration::from_millis(5000))]
    pub max_delay: Duration,

    /// `worker.shutdownTimeoutSeconds` — grace period for in-flight consumers.
    #[builder(default = Duration::from_secs(30))]
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Tunables governing the Job Manager's retry policy.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct JobManagerConfig {
    /// `jobManager.defaultMaxRetries`
    #[builder(default = 3)]
    pub default_max_retries: u32,

    /// `jobManager.retryDelayBaseSeconds`
    #[builder(default = 5)]
    pub retry_delay_base_seconds: u64,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Tunables for the distributed recovery loop.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct RecoveryConfig {
    /// `recovery.enableDistributedJobRecovery` — the task does not run at
    /// all unless this is true *and* the configured store reports
    /// `supports_recovery() == true`.
    #[builder(default = false)]
    pub enabled: bool,

    /// `recovery.jobTimeoutMinutes` — how long an `InProgress` job can run
    /// before it's considered abandoned.
    #[builder(default = Duration::from_secs(30 * 60))]
    pub job_timeout: Duration,

    /// `recovery.recoveryCheckIntervalSeconds`
    #[builder(default = Duration::from_secs(300))]
    pub check_interval: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
