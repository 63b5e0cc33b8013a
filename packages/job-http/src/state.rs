//! Shared state the submit/status handlers close over.

use std::sync::Arc;

use job_core::JobManager;

#[derive(Clone)]
pub struct JobHttpState {
    pub manager: Arc<JobManager>,
}

impl JobHttpState {
    pub fn new(manager: Arc<JobManager>) -> Self {
        Self { manager }
    }
}
