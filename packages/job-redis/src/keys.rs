//! Redis key names for the job store.
//!
//! Grounded on `RedisQueueInfo` from the apalis-redis example: a small
//! struct of owned `String` keys built once at construction time rather
//! than reformatted on every call.

use uuid::Uuid;

/// The three key families this store touches, all under one shared
/// namespace (`"ae"` by default).
#[derive(Clone, Debug)]
pub struct RedisKeys {
    /// Prefix for per-job hashes: `ae:job:{id}`.
    pub job_prefix: String,
    /// Sorted-set ready index: `ae:jobs:queue`.
    pub ready_index: String,
    /// Recovery mutual-exclusion lock: `ae:recovery:lock`.
    pub recovery_lock: String,
}

impl RedisKeys {
    /// `namespace` lets multiple logical queues share one Redis
    /// instance without key collisions; the default keyspace uses `"ae"`.
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            job_prefix: format!("{namespace}:job:"),
            ready_index: format!("{namespace}:jobs:queue"),
            recovery_lock: format!("{namespace}:recovery:lock"),
        }
    }

    pub fn job_key(&self, id: Uuid) -> String {
        format!("{}{}", self.job_prefix, id)
    }

    pub fn scan_pattern(&self) -> String {
        format!("{}*", self.job_prefix)
    }
}

impl Default for RedisKeys {
    fn default() -> Self {
        Self::new("ae")
    }
}
