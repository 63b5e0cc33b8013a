//! Delay Calculator and Producer loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::claiming::{ClaimOutcome, JobClaimingService};
use crate::config::WorkerConfig;

/// Maps a claim outcome to how long the Producer sleeps before its next
/// attempt.
pub fn delay_for_outcome(outcome: ClaimOutcome, config: &WorkerConfig) -> Duration {
    match outcome {
        ClaimOutcome::JobEnqueued => config.polling_interval,
        ClaimOutcome::NoJobFound => (config.polling_interval * 3).min(config.max_delay),
        ClaimOutcome::FailedToEnqueue => config.polling_interval * 2,
        ClaimOutcome::ErrorOccurred => config.error_delay,
    }
}

/// Single logical producer: repeatedly claims one job and hands it to
/// the channel, backing off according to [`delay_for_outcome`], until
/// `cancellation` fires.
pub struct Producer {
    claiming_service: Arc<JobClaimingService>,
    config: WorkerConfig,
    cancellation: CancellationToken,
}

impl Producer {
    pub fn new(
        claiming_service: Arc<JobClaimingService>,
        config: WorkerConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            claiming_service,
            config,
            cancellation,
        }
    }

    /// Run until cancellation. Does not close the channel itself — that
    /// is the caller's responsibility once `run` returns, since the
    /// `Sender` this producer drives is owned outside this struct.
    pub async fn run(&self) {
        loop {
            if self.cancellation.is_cancelled() {
                tracing::debug!("producer: cancellation observed, stopping");
                return;
            }

            let outcome = self.claiming_service.claim_and_enqueue().await;
            let delay = delay_for_outcome(outcome, &self.config);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancellation.cancelled() => {
                    tracing::debug!("producer: cancellation observed during sleep, stopping");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_enqueued_uses_base_interval() {
        let config = WorkerConfig::default();
        assert_eq!(
            delay_for_outcome(ClaimOutcome::JobEnqueued, &config),
            config.polling_interval
        );
    }

    #[test]
    fn no_job_found_backs_off_but_is_capped() {
        let config = WorkerConfig::builder()
            .polling_interval(Duration::from_secs(10))
            .max_delay(Duration::from_secs(15))
            .build();
        assert_eq!(delay_for_outcome(ClaimOutcome::NoJobFound, &config), Duration::from_secs(15));
    }

    #[test]
    fn failed_to_enqueue_doubles_base_interval() {
        let config = WorkerConfig::default();
        assert_eq!(
            delay_for_outcome(ClaimOutcome::FailedToEnqueue, &config),
            config.polling_interval * 2
        );
    }

    #[test]
    fn error_occurred_uses_fixed_error_delay() {
        let config = WorkerConfig::default();
        assert_eq!(delay_for_outcome(ClaimOutcome::ErrorOccurred, &config), config.error_delay);
    }
}
