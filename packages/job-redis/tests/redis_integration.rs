//! Live-Redis behavioral tests: claim atomicity and stuck-job recovery.
//!
//! Ignored by default since they need a Docker daemon — run with
//! `cargo test -p job-redis -- --ignored`. Grounded on
//! `packages/server/tests/common/harness.rs`, which spins up
//! `testcontainers_modules` images the same way for its own Postgres +
//! Redis integration suite.

use std::time::Duration;

use chrono::Utc;
use job_core::{Job, JobStatus, JobStore};
use job_redis::{connect, RedisStore, RedisStoreConfig};
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;
use uuid::Uuid;

async fn store() -> (RedisStore, testcontainers::ContainerAsync<Redis>) {
    let container = Redis::default().start().await.expect("start redis container");
    let host = container.get_host().await.expect("container host");
    let port = container.get_host_port_ipv4(6379).await.expect("container port");
    let url = format!("redis://{host}:{port}");

    let conn = connect(url).await.expect("connect to redis");
    let store = RedisStore::new(conn, RedisStoreConfig::default());
    (store, container)
}

fn queued_job(name: &str) -> Job {
    let now = Utc::now();
    Job::builder()
        .name(name.to_string())
        .payload("{}".to_string())
        .created_at(now)
        .last_updated_at(now)
        .build()
}

#[tokio::test]
#[ignore]
async fn create_then_claim_round_trips_through_redis() {
    let (store, _container) = store().await;
    let job = queued_job("echo");

    store.create_job(job.clone()).await.unwrap();

    let fetched = store.get_job_by_id(job.id).await.unwrap();
    assert_eq!(fetched.status, JobStatus::Queued);

    let claimed = store
        .claim_next_available_job(Uuid::new_v4())
        .await
        .unwrap()
        .expect("one eligible job");
    assert_eq!(claimed.id, job.id);
    assert_eq!(claimed.status, JobStatus::InProgress);

    let nothing_left = store.claim_next_available_job(Uuid::new_v4()).await.unwrap();
    assert!(nothing_left.is_none());
}

#[tokio::test]
#[ignore]
async fn concurrent_claims_never_double_win_against_redis() {
    let (store, _container) = store().await;
    let job = queued_job("echo");
    store.create_job(job.clone()).await.unwrap();

    let store = std::sync::Arc::new(store);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.claim_next_available_job(Uuid::new_v4()).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
#[ignore]
async fn recover_stuck_jobs_retries_an_inprogress_job_past_its_timeout() {
    let (store, _container) = store().await;
    let job = queued_job("flaky");
    store.create_job(job.clone()).await.unwrap();
    store.claim_next_available_job(Uuid::new_v4()).await.unwrap();

    let recovered = store
        .recover_stuck_jobs(Utc::now() - chrono::Duration::seconds(1), 3, 1)
        .await
        .unwrap();
    assert_eq!(recovered, 0, "job hasn't timed out yet");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let recovered = store
        .recover_stuck_jobs(Utc::now() - chrono::Duration::seconds(1), 3, 1)
        .await
        .unwrap();
    assert_eq!(recovered, 1);

    let after = store.get_job_by_id(job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Scheduled);
    assert_eq!(after.retry_count, 1);
}

#[tokio::test]
#[ignore]
async fn heartbeat_keeps_recovery_from_reclaiming_a_still_running_job() {
    let (store, _container) = store().await;
    let job = queued_job("slow");
    store.create_job(job.clone()).await.unwrap();
    let worker_id = Uuid::new_v4();
    store.claim_next_available_job(worker_id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    store.heartbeat(job.id, worker_id).await.unwrap();

    let recovered = store
        .recover_stuck_jobs(Utc::now() - chrono::Duration::seconds(1), 3, 1)
        .await
        .unwrap();
    assert_eq!(recovered, 0, "the heartbeat should have renewed the lease past the timeout");

    let after = store.get_job_by_id(job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::InProgress);
}

#[tokio::test]
#[ignore]
async fn heartbeat_from_the_wrong_worker_is_rejected() {
    let (store, _container) = store().await;
    let job = queued_job("echo");
    store.create_job(job.clone()).await.unwrap();
    store.claim_next_available_job(Uuid::new_v4()).await.unwrap();

    let err = store.heartbeat(job.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, job_core::StoreError::Invalid(_)));
}
