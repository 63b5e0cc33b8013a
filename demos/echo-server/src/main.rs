//! Composition root: wires a [`job_core::JobManager`] over either
//! in-memory or Redis storage, starts the producer/consumer pipeline
//! and (optionally) the recovery loop, and serves the HTTP glue.
//!
//! Grounded on `packages/server/src/server/main.rs`'s startup sequence
//! (tracing init → config load → connect → build app → bind → serve)
//! and `kernel::jobs::runner::JobRunner::run_until_shutdown`'s
//! ctrl_c-driven cancellation shape.

mod config;
mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use job_core::{
    ChannelEnqueuer, ConsumerPool, HandlerRegistry, JobClaimingService, JobManager, JobProcessor, JobStore,
    Producer, RecoveryService, SystemClock, TracingRecorder,
};
use job_http::{job_router, JobHttpState, SubmitRoute};
use job_memory::InMemoryStore;
use job_redis::{connect, RedisStore, RedisStoreConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, StoreBackend};
use handlers::{register_demo_handlers, FlakyAttempts};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_core=debug,job_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting echo-server");

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(backend = ?config.store_backend, bind_addr = %config.bind_addr, "configuration loaded");

    let store: Arc<dyn JobStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
        StoreBackend::Redis => {
            let conn = connect(config.redis_url.clone())
                .await
                .context("failed to connect to redis")?;
            Arc::new(RedisStore::new(conn, RedisStoreConfig::default()))
        }
    };

    let recorder = Arc::new(TracingRecorder);
    let clock = Arc::new(SystemClock);
    let manager = Arc::new(JobManager::new(store.clone(), clock.clone(), recorder.clone(), config.job_manager.clone()));

    let mut registry = HandlerRegistry::new();
    register_demo_handlers(&mut registry, Arc::new(FlakyAttempts::default()));
    let registry = Arc::new(registry);

    let processor = Arc::new(JobProcessor::new(registry, manager.clone(), recorder.clone()));

    let cancellation = CancellationToken::new();
    let (tx, rx) = tokio::sync::mpsc::channel(config.worker.maximum_queue_size);
    let enqueuer = Arc::new(ChannelEnqueuer::new(tx, config.worker.channel_write_timeout));
    let claiming_service = Arc::new(JobClaimingService::new(manager.clone(), enqueuer, config.worker.worker_id));
    let producer = Producer::new(claiming_service, config.worker.clone(), cancellation.clone());
    let producer_handle = tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            tokio::select! {
                _ = producer.run() => {}
                _ = cancellation.cancelled() => {}
            }
        }
    });

    let consumer_pool = ConsumerPool::new(rx, processor, config.worker.maximum_concurrency, cancellation.clone());
    let consumer_handles = consumer_pool.spawn();

    let recovery_service = Arc::new(RecoveryService::new(
        store.clone(),
        clock,
        recorder,
        config.recovery.clone(),
        config.job_manager.default_max_retries,
        config.job_manager.retry_delay_base_seconds,
        cancellation.clone(),
    ));
    let recovery_handle = tokio::spawn({
        let recovery_service = recovery_service.clone();
        async move { recovery_service.run().await }
    });

    let state = JobHttpState::new(manager);
    let submit_routes = vec![
        SubmitRoute::json("/echo", "echo"),
        SubmitRoute::json("/flaky", "flaky"),
        SubmitRoute::json("/broken", "broken"),
    ];
    let app = job_router(state, submit_routes, "/jobs/:id");

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind listener")?;
    tracing::info!(addr = %config.bind_addr, "listening");

    let shutdown_timeout = config.worker.shutdown_timeout;
    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    cancellation.cancel();
    let drain = async {
        let _ = producer_handle.await;
        for handle in consumer_handles {
            let _ = handle.await;
        }
        let _ = recovery_handle.await;
    };
    if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
        tracing::warn!("shutdown grace period elapsed with work still in flight");
    }

    Ok(())
}
