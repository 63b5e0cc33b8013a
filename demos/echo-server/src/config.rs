//! Environment-driven configuration.
//!
//! Grounded on `packages/server/src/config.rs`'s `Config::from_env`:
//! load `.env` if present, read required keys with `anyhow::Context`,
//! fall back to each tunable's documented default for everything
//! optional. Env var names are the dotted config key upper-cased with
//! `.` replaced by `_`, e.g. `worker.maximumConcurrency` →
//! `WORKER_MAXIMUM_CONCURRENCY`.

use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use job_core::{JobManagerConfig, RecoveryConfig, WorkerConfig};
use std::env;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub worker: WorkerConfig,
    pub job_manager: JobManagerConfig,
    pub recovery: RecoveryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let port = env_or("PORT", "8080");
        let bind_addr = format!("0.0.0.0:{port}");

        let store_backend = match env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string()).as_str() {
            "redis" => StoreBackend::Redis,
            "memory" | "" => StoreBackend::Memory,
            other => anyhow::bail!("STORE_BACKEND must be \"memory\" or \"redis\", got {other:?}"),
        };
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let mut worker = WorkerConfig::builder()
            .maximum_concurrency(env_parsed("WORKER_MAXIMUM_CONCURRENCY", WorkerConfig::default().maximum_concurrency)?)
            .maximum_queue_size(env_parsed("WORKER_MAXIMUM_QUEUE_SIZE", 50usize)?)
            .polling_interval(Duration::from_millis(env_parsed("WORKER_POLLING_INTERVAL_MS", 1000u64)?))
            .channel_write_timeout(Duration::from_secs(env_parsed("WORKER_CHANNEL_WRITE_TIMEOUT_SECONDS", 5u64)?))
            .error_delay(Duration::from_secs(env_parsed("WORKER_ERROR_DELAY_SECONDS", 5u64)?))
            .max_delay(Duration::from_millis(env_parsed("WORKER_MAX_DELAY_MS", 5000u64)?))
            .shutdown_timeout(Duration::from_secs(env_parsed("WORKER_SHUTDOWN_TIMEOUT_SECONDS", 30u64)?))
            .build();
        if let Ok(worker_id) = env::var("WORKER_WORKER_ID") {
            worker.worker_id = worker_id.parse::<Uuid>().context("WORKER_WORKER_ID must be a UUID")?;
        }

        let job_manager = JobManagerConfig::builder()
            .default_max_retries(env_parsed("JOB_MANAGER_DEFAULT_MAX_RETRIES", 3u32)?)
            .retry_delay_base_seconds(env_parsed("JOB_MANAGER_RETRY_DELAY_BASE_SECONDS", 5u64)?)
            .build();

        let recovery = RecoveryConfig::builder()
            .enabled(env_parsed("RECOVERY_ENABLE_DISTRIBUTED_JOB_RECOVERY", false)?)
            .job_timeout(Duration::from_secs(env_parsed::<u64>("RECOVERY_JOB_TIMEOUT_MINUTES", 30)? * 60))
            .check_interval(Duration::from_secs(env_parsed("RECOVERY_RECOVERY_CHECK_INTERVAL_SECONDS", 300u64)?))
            .build();

        Ok(Self {
            bind_addr,
            store_backend,
            redis_url,
            worker,
            job_manager,
            recovery,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parsed_falls_back_to_default_when_unset() {
        std::env::remove_var("ECHO_SERVER_TEST_KEY_NOT_SET");
        let value = env_parsed("ECHO_SERVER_TEST_KEY_NOT_SET", 42u32).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn env_parsed_rejects_malformed_values() {
        std::env::set_var("ECHO_SERVER_TEST_KEY_MALFORMED", "not-a-number");
        let result = env_parsed::<u32>("ECHO_SERVER_TEST_KEY_MALFORMED", 1);
        assert!(result.is_err());
        std::env::remove_var("ECHO_SERVER_TEST_KEY_MALFORMED");
    }
}
