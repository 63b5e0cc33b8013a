//! Distributed [`JobStore`](job_core::JobStore) backed by Redis.
//!
//! Each job is a hash keyed `{ns}:job:{id}`; a sorted set `{ns}:jobs:queue`
//! is the ready index; every mutation that must stay atomic with the
//! index runs as a Lua script under Redis's single-threaded execution
//! model. Grounded on the apalis-redis example's `connect()` helper,
//! `RedisScript` bundle, and `Config` struct shape, generalized from its
//! list/stream-based queue design to the hash-per-job + sorted-set
//! design this store's keyspace calls for.

mod encode;
mod keys;
mod lock;
mod scripts;

pub use keys::RedisKeys;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use job_core::{Job, JobStatus, JobStore, StoreError};
use redis::{aio::ConnectionManager, AsyncCommands, Client, IntoConnectionInfo, RedisError, ScanOptions};
use tokio::sync::Mutex;
use uuid::Uuid;

use scripts::RedisScripts;

/// Shorthand matching the apalis-redis example's `connect` helper:
/// build a client, then hand back a multiplexed, auto-reconnecting
/// connection manager.
pub async fn connect<S: IntoConnectionInfo>(redis_url: S) -> Result<ConnectionManager, RedisError> {
    let client = Client::open(redis_url.into_connection_info()?)?;
    client.get_connection_manager().await
}

/// Tunables specific to the Redis backend; the pipeline-level tunables
/// in [`job_core::config::WorkerConfig`] are unrelated.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Keyspace namespace prefix for every key this store touches.
    pub namespace: String,
    /// How many keys `SCAN` asks for per round during a recovery pass.
    pub scan_batch_size: usize,
    /// TTL on the recovery mutual-exclusion lock; should be roughly the
    /// recovery check interval.
    pub recovery_lock_ttl: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            namespace: "ae".to_string(),
            scan_batch_size: 100,
            recovery_lock_ttl: Duration::from_secs(300),
        }
    }
}

pub struct RedisStore {
    conn: Mutex<ConnectionManager>,
    keys: RedisKeys,
    scripts: RedisScripts,
    config: RedisStoreConfig,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self {
            conn: Mutex::new(conn),
            keys: RedisKeys::new(config.namespace.clone()),
            scripts: RedisScripts::default(),
            config,
        }
    }

    fn to_storage_unavailable(err: RedisError) -> StoreError {
        StoreError::StorageUnavailable(anyhow::anyhow!(err))
    }
}

#[async_trait]
impl JobStore for RedisStore {
    async fn create_job(&self, job: Job) -> Result<(), StoreError> {
        let job_key = self.keys.job_key(job.id);
        let mut conn = self.conn.lock().await;

        let exists: bool = conn.exists(&job_key).await.map_err(Self::to_storage_unavailable)?;
        if exists {
            return Err(StoreError::Duplicate { id: job.id });
        }

        let fields = encode::job_to_hash_fields(&job);
        let _: () = conn.hset_multiple(&job_key, &fields).await.map_err(Self::to_storage_unavailable)?;

        if job.status.is_claimable_status() {
            let _: () = conn
                .zadd(&self.keys.ready_index, job.id.to_string(), job.ready_score())
                .await
                .map_err(Self::to_storage_unavailable)?;
        }
        Ok(())
    }

    async fn get_job_by_id(&self, id: Uuid) -> Result<Job, StoreError> {
        let job_key = self.keys.job_key(id);
        let mut conn = self.conn.lock().await;
        let fields: Vec<(String, String)> = conn.hgetall(&job_key).await.map_err(Self::to_storage_unavailable)?;
        if fields.is_empty() {
            return Err(StoreError::NotFound { id });
        }
        encode::hash_fields_to_job(&fields).map_err(StoreError::StorageUnavailable)
    }

    async fn update_job(&self, mut job: Job) -> Result<(), StoreError> {
        job.last_updated_at = Utc::now();
        let job_key = self.keys.job_key(job.id);
        let mut conn = self.conn.lock().await;

        let exists: bool = conn.exists(&job_key).await.map_err(Self::to_storage_unavailable)?;
        if !exists {
            return Err(StoreError::NotFound { id: job.id });
        }

        let fields = encode::job_to_hash_fields(&job);
        let _: () = conn.hset_multiple(&job_key, &fields).await.map_err(Self::to_storage_unavailable)?;

        if job.status.is_claimable_status() {
            let _: () = conn
                .zadd(&self.keys.ready_index, job.id.to_string(), job.ready_score())
                .await
                .map_err(Self::to_storage_unavailable)?;
        } else {
            let _: () = conn
                .zrem(&self.keys.ready_index, job.id.to_string())
                .await
                .map_err(Self::to_storage_unavailable)?;
        }
        Ok(())
    }

    async fn get_jobs_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, StoreError> {
        let mut conn = self.conn.lock().await;
        let job_keys = self.scan_job_keys(&mut conn).await?;

        let mut matches = Vec::new();
        for job_key in job_keys {
            if matches.len() >= limit {
                break;
            }
            let fields: Vec<(String, String)> =
                conn.hgetall(&job_key).await.map_err(Self::to_storage_unavailable)?;
            if fields.is_empty() {
                continue;
            }
            if let Ok(job) = encode::hash_fields_to_job(&fields) {
                if job.status == status {
                    matches.push(job);
                }
            }
        }
        Ok(matches)
    }

    async fn claim_next_available_job(&self, worker_id: Uuid) -> Result<Option<Job>, StoreError> {
        let now_instant = Utc::now();
        let now = now_instant.timestamp();
        let mut conn = self.conn.lock().await;

        let fields: Option<Vec<(String, String)>> = self
            .scripts
            .claim
            .key(&self.keys.ready_index)
            .arg(now)
            .arg(&self.keys.job_prefix)
            .arg(worker_id.to_string())
            .arg(now)
            .arg(now_instant.to_rfc3339())
            .invoke_async(&mut *conn)
            .await
            .map_err(Self::to_storage_unavailable)?;

        match fields {
            Some(fields) if !fields.is_empty() => {
                encode::hash_fields_to_job(&fields).map(Some).map_err(StoreError::StorageUnavailable)
            }
            _ => Ok(None),
        }
    }

    async fn recover_stuck_jobs(
        &self,
        timeout_instant: DateTime<Utc>,
        max_retries: u32,
        retry_base_seconds: u64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn.lock().await;

        let nonce = lock::acquire(&mut conn, &self.keys, &self.scripts, self.config.recovery_lock_ttl.as_secs())
            .await
            .map_err(StoreError::StorageUnavailable)?;
        let Some(nonce) = nonce else {
            tracing::debug!("recovery: lock held by another instance, skipping this cycle");
            return Ok(0);
        };

        let recovered = self
            .scan_and_recover(&mut conn, timeout_instant, max_retries, retry_base_seconds)
            .await;

        if let Err(err) = lock::release(&mut conn, &self.keys, &self.scripts, &nonce).await {
            tracing::warn!(error = %err, "recovery: failed to release distributed lock");
        }

        recovered
    }

    fn supports_recovery(&self) -> bool {
        true
    }

    async fn heartbeat(&self, id: Uuid, worker_id: Uuid) -> Result<(), StoreError> {
        let job_key = self.keys.job_key(id);
        let now_instant = Utc::now();
        let now = now_instant.timestamp();
        let mut conn = self.conn.lock().await;

        let extended: i64 = self
            .scripts
            .heartbeat
            .key(&job_key)
            .arg(worker_id.to_string())
            .arg(now)
            .arg(now_instant.to_rfc3339())
            .invoke_async(&mut *conn)
            .await
            .map_err(Self::to_storage_unavailable)?;

        if extended == 1 {
            return Ok(());
        }

        let exists: bool = conn.exists(&job_key).await.map_err(Self::to_storage_unavailable)?;
        if exists {
            Err(StoreError::Invalid(format!(
                "job {id} is not InProgress under worker {worker_id}"
            )))
        } else {
            Err(StoreError::NotFound { id })
        }
    }
}

impl RedisStore {
    async fn scan_and_recover(
        &self,
        conn: &mut ConnectionManager,
        timeout_instant: DateTime<Utc>,
        max_retries: u32,
        retry_base_seconds: u64,
    ) -> Result<u64, StoreError> {
        let now_instant = Utc::now();
        let now = now_instant.timestamp();
        let timeout_unix = timeout_instant.timestamp();
        let mut recovered = 0u64;

        let job_keys = self.scan_job_keys(conn).await?;
        for job_key in job_keys {
            let id = job_key
                .strip_prefix(&self.keys.job_prefix)
                .unwrap_or(job_key.as_str());

            let did_recover: i64 = self
                .scripts
                .recover_one
                .key(job_key.as_str())
                .key(&self.keys.ready_index)
                .arg(id)
                .arg(timeout_unix)
                .arg(max_retries)
                .arg(retry_base_seconds)
                .arg(now)
                .arg(now_instant.to_rfc3339())
                .invoke_async(conn)
                .await
                .map_err(Self::to_storage_unavailable)?;

            if did_recover == 1 {
                recovered += 1;
            }
        }

        Ok(recovered)
    }

    /// Cursor-paged `SCAN` over the job-hash keyspace, materialized into
    /// one `Vec` here so the caller can issue further commands on `conn`
    /// per key without holding the scan cursor open across them (the
    /// `redis` crate ties the iterator's lifetime to the connection
    /// borrow). `scan_batch_size` bounds the `COUNT` hint per round-trip,
    /// not the total result size.
    async fn scan_job_keys(&self, conn: &mut ConnectionManager) -> Result<Vec<String>, StoreError> {
        let options = ScanOptions::default()
            .with_pattern(self.keys.scan_pattern())
            .with_count(self.config.scan_batch_size);
        let mut iter = conn
            .scan_options::<String>(options)
            .await
            .map_err(Self::to_storage_unavailable)?;
        let mut keys = Vec::new();
        while let Some(key) = iter.next().await {
            keys.push(key);
        }
        Ok(keys)
    }
}
