//! Type-erased handler registry.
//!
//! Grounded on `kernel::jobs::registry::JobRegistry` (the `BoxedHandler`
//! closure that captures deserialization, invocation and
//! re-serialization behind one `Fn`) and `seesaw::job::CommandRegistry`
//! (the `DeserializeFn` boxed-closure approach to type erasure, plus its
//! `is_registered`/`registered_types` introspection and test style).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{classify_error, JobError};
use crate::heartbeat::HeartbeatHandle;
use crate::job::Job;

/// Result of running a handler: the success payload, pre-serialized to a
/// JSON string so the registry's return type doesn't need to carry a
/// generic.
pub type HandlerOutput = Pin<Box<dyn Future<Output = Result<String, JobError>> + Send>>;

/// A boxed, type-erased handler: the claimed job in (its `payload` is
/// decoded by the wrapper this module builds), a cancellation token the
/// handler is expected to cooperate with, a heartbeat handle it may use
/// to extend its own lease, JSON result string (or structured error) out.
type BoxedHandler = Arc<dyn Fn(Job, CancellationToken, HeartbeatHandle) -> HandlerOutput + Send + Sync>;

/// Maps job type names to the handler that executes them.
///
/// Registration happens once at startup (typically from `demos/echo-server`
/// or an equivalent composition root); lookup happens once per claimed job
/// on the consumer's hot path, so `execute` takes `&self` and never
/// blocks on a lock longer than a `HashMap` read would.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `name`. `F` takes the deserialized request
    /// type `Req`, the claimed [`Job`] itself, a cancellation token, and a
    /// [`HeartbeatHandle`] the handler may call periodically to extend its
    /// own lease, and returns a future of `Result<Res, JobError>`; the
    /// registry handles decoding `job.payload` into `Req` and encoding the
    /// returned `Res` back to JSON, exactly the division of labor
    /// `JobRegistry::register` draws.
    pub fn register<Req, Res, F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req, Job, CancellationToken, HeartbeatHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, JobError>> + Send + 'static,
    {
        let name = name.into();
        let handler = Arc::new(handler);
        let insert_key = name.clone();
        let boxed: BoxedHandler =
            Arc::new(move |job: Job, cancellation: CancellationToken, heartbeat: HeartbeatHandle| {
                let handler = Arc::clone(&handler);
                let name = name.clone();
                Box::pin(async move {
                    let request: Req = serde_json::from_str(&job.payload).map_err(|e| {
                        JobError::DeserializationFailed {
                            job_name: name.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    let response = handler(request, job, cancellation, heartbeat).await?;
                    serde_json::to_string(&response).map_err(|e| JobError::HandlerError {
                        code: "SerializationFailed".to_string(),
                        message: e.to_string(),
                    })
                })
            });
        self.handlers.insert(insert_key, boxed);
    }

    /// Register a handler whose body returns a bare `anyhow::Error`
    /// instead of a structured [`JobError`], classifying the failure via
    /// [`classify_error`] — convenient for handlers that call into
    /// ordinary fallible code and don't want to construct
    /// `JobError::HandlerError` by hand.
    pub fn register_fallible<Req, Res, F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req, Job, CancellationToken, HeartbeatHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Res>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register(
            name,
            move |req: Req, job: Job, cancellation: CancellationToken, heartbeat: HeartbeatHandle| {
                let handler = Arc::clone(&handler);
                async move { handler(req, job, cancellation, heartbeat).await.map_err(|e| classify_error(&e)) }
            },
        );
    }

    /// Execute the handler registered for `job.name` against `job`, or
    /// `JobError::HandlerNotFound` if nothing is registered.
    pub async fn execute(
        &self,
        job: Job,
        cancellation: CancellationToken,
        heartbeat: HeartbeatHandle,
    ) -> Result<String, JobError> {
        let handler = self
            .handlers
            .get(&job.name)
            .cloned()
            .ok_or_else(|| JobError::HandlerNotFound {
                job_name: job.name.clone(),
            })?;
        handler(job, cancellation, heartbeat).await
    }

    pub fn is_registered(&self, job_name: &str) -> bool {
        self.handlers.contains_key(job_name)
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
