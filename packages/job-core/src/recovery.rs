//! Distributed Recovery: periodic scan that reclaims orphaned
//! `InProgress` jobs.
//!
//! Grounded on `kernel::jobs::runner::JobRunner`'s periodic-scan loop
//! shape, generalized to call through `JobStore::recover_stuck_jobs`
//! instead of a Postgres-specific query, and gated on both
//! configuration and the store's `supports_recovery()` capability.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::RecoveryConfig;
use crate::recorder::Recorder;
use crate::store::JobStore;

/// Runs the recovery scan loop until cancelled. Does nothing — not even
/// spawn a sleep loop — unless both `config.enabled` and
/// `store.supports_recovery()` hold.
pub struct RecoveryService {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    recorder: Arc<dyn Recorder>,
    config: RecoveryConfig,
    default_max_retries: u32,
    retry_delay_base_seconds: u64,
    cancellation: CancellationToken,
}

impl RecoveryService {
    pub fn new(
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        recorder: Arc<dyn Recorder>,
        config: RecoveryConfig,
        default_max_retries: u32,
        retry_delay_base_seconds: u64,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            store,
            clock,
            recorder,
            config,
            default_max_retries,
            retry_delay_base_seconds,
            cancellation,
        }
    }

    pub async fn run(&self) {
        if !self.config.enabled {
            tracing::debug!("recovery: disabled in configuration, not starting");
            return;
        }
        if !self.store.supports_recovery() {
            tracing::warn!("recovery: enabled in configuration but the configured store does not support it");
            return;
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval) => {}
                _ = self.cancellation.cancelled() => {
                    tracing::debug!("recovery: cancellation observed, stopping");
                    return;
                }
            }

            let timeout_instant = self.clock.now()
                - ChronoDuration::from_std(self.config.job_timeout).unwrap_or(ChronoDuration::zero());

            match self
                .store
                .recover_stuck_jobs(timeout_instant, self.default_max_retries, self.retry_delay_base_seconds)
                .await
            {
                Ok(count) => {
                    tracing::info!(recovered_count = count, "recovery: scan completed");
                    self.recorder.recovery_scan_completed(count);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "recovery: scan failed, will retry next cycle");
                }
            }
        }
    }
}
