//! Consumer Pool: N workers sharing one channel receiver, bounded by a
//! semaphore.
//!
//! Grounded on `kernel::jobs::worker::JobWorker::execute_with_heartbeat`'s
//! `tokio::select!`-against-cancellation shape, and on the general
//! pattern elsewhere in this codebase of spawning one `tokio::task` per
//! logical worker and joining them on shutdown.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::job::Job;
use crate::processor::JobProcessor;

/// Owns the shared receiving half of the job channel and spawns
/// `concurrency` worker tasks that all pull from it.
pub struct ConsumerPool {
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    semaphore: Arc<Semaphore>,
    processor: Arc<JobProcessor>,
    concurrency: usize,
    cancellation: CancellationToken,
}

impl ConsumerPool {
    pub fn new(
        receiver: mpsc::Receiver<Job>,
        processor: Arc<JobProcessor>,
        concurrency: usize,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            semaphore: Arc::new(Semaphore::new(concurrency)),
            processor,
            concurrency,
            cancellation,
        }
    }

    /// Spawn `concurrency` worker loops and return their join handles so
    /// the caller can await them during shutdown.
    pub fn spawn(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.concurrency)
            .map(|_| {
                let receiver = Arc::clone(&self.receiver);
                let semaphore = Arc::clone(&self.semaphore);
                let processor = Arc::clone(&self.processor);
                let cancellation = self.cancellation.clone();
                tokio::spawn(async move { worker_loop(receiver, semaphore, processor, cancellation).await })
            })
            .collect()
    }
}

async fn worker_loop(
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    semaphore: Arc<Semaphore>,
    processor: Arc<JobProcessor>,
    cancellation: CancellationToken,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            tracing::debug!("consumer: channel closed, exiting worker loop");
            return;
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("consumer: semaphore closed, exiting worker loop");
                return;
            }
        };

        let child_token = cancellation.child_token();
        // Never propagate: a handler panic or processing error must not
        // kill this worker loop.
        let job_id = job.id;
        if let Err(panic) = tokio::spawn({
            let processor = Arc::clone(&processor);
            async move { processor.process(job, child_token).await }
        })
        .await
        {
            tracing::error!(job_id = %job_id, error = %panic, "consumer: handler task panicked");
        }
        drop(permit);
    }
}
