//! Non-blocking-first write into the bounded producer→consumer channel,
//! with a timed blocking fallback.
//!
//! Grounded on `kernel::jobs::worker::JobWorker`'s use of
//! `tokio::sync::mpsc` as the hand-off between loops, generalized into
//! its own collaborator so the Producer doesn't need to know about
//! timeouts or the non-blocking/blocking split.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::job::Job;

/// Wraps the sending half of the bounded job channel.
pub struct ChannelEnqueuer {
    sender: mpsc::Sender<Job>,
    write_timeout: Duration,
}

impl ChannelEnqueuer {
    pub fn new(sender: mpsc::Sender<Job>, write_timeout: Duration) -> Self {
        Self {
            sender,
            write_timeout,
        }
    }

    /// Try a non-blocking send first; on a full channel, fall back to a
    /// blocking send bounded by `write_timeout`. Returns `true` on
    /// success; `false` on timeout, cancellation, or a closed receiver —
    /// never an `Err`.
    pub async fn enqueue(&self, job: Job) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("channel enqueuer: receiver dropped, job not enqueued");
                false
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                match timeout(self.write_timeout, self.sender.send(job)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => {
                        tracing::warn!("channel enqueuer: receiver dropped during blocking send");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(
                            timeout_secs = self.write_timeout.as_secs(),
                            "channel enqueuer: blocking send timed out"
                        );
                        false
                    }
                }
            }
        }
    }
}
