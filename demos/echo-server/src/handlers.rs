//! The three demo handlers used by the end-to-end scenarios.
//!
//! Registered against a [`job_core::HandlerRegistry`] the same way
//! `kernel::jobs::registry::JobRegistry::register` is used in seed/demo
//! code elsewhere: one closure per job name, closing over whatever state
//! that handler needs.

use std::collections::HashMap;
use std::sync::Mutex;

use job_core::{HandlerRegistry, JobError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct EchoRequest {
    pub v: i64,
}

#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub out: i64,
}

#[derive(Debug, Deserialize)]
pub struct FlakyRequest {}

/// Tracks how many times each job id has hit the "flaky" handler, since
/// the handler itself is stateless per-call but the scenario needs
/// "fails twice, then succeeds" per job, not per process.
#[derive(Default)]
pub struct FlakyAttempts {
    counts: Mutex<HashMap<Uuid, u32>>,
}

impl FlakyAttempts {
    fn next_attempt(&self, job_id: Uuid) -> u32 {
        let mut counts = self.counts.lock().expect("flaky attempts lock poisoned");
        let count = counts.entry(job_id).or_insert(0);
        *count += 1;
        *count
    }
}

/// Registers `echo`, `flaky` and `broken` against `registry`.
/// `flaky_state` is shared with the caller so tests can assert on
/// attempt counts if needed.
pub fn register_demo_handlers(registry: &mut HandlerRegistry, flaky_state: std::sync::Arc<FlakyAttempts>) {
    registry.register("echo", |req: EchoRequest, _job, _cancellation, _heartbeat| async move {
        Ok::<_, JobError>(EchoResponse { out: req.v * 2 })
    });

    registry.register("flaky", move |_req: FlakyRequest, job, _cancellation, _heartbeat| {
        let flaky_state = flaky_state.clone();
        async move {
            let attempt = flaky_state.next_attempt(job.id);
            if attempt < 3 {
                return Err(JobError::HandlerError {
                    code: "E".to_string(),
                    message: "x".to_string(),
                });
            }
            Ok("ok".to_string())
        }
    });

    registry.register("broken", |_req: serde_json::Value, _job, _cancellation, _heartbeat| async move {
        Err::<serde_json::Value, _>(JobError::HandlerError {
            code: "E".to_string(),
            message: "always fails".to_string(),
        })
    });
}
