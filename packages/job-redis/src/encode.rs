//! Job <-> Redis hash encoding.
//!
//! Timestamps are stored as ISO 8601 strings (`CreatedAt`, `StartedAt`,
//! `CompletedAt`, `LastUpdatedAt`), matching the documented keyspace
//! contract. `StartedAt` additionally gets a numeric duplicate,
//! `StartedAtUnix`: `recover_one.lua` needs to compare and arithmetically
//! adjust it deterministically, and no date-formatting primitives are
//! available inside the Redis scripting sandbox, so the scripts that
//! write or read a worker's claim time exchange that one field as a
//! plain epoch integer instead. Everything else round-trips through the
//! ISO string alone. Optional fields use the empty string as the
//! Redis-side "absent" sentinel, matching what `claim.lua` and
//! `recover_one.lua` check for.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use job_core::{Job, JobErrorRecord, JobStatus};
use uuid::Uuid;

fn to_unix(instant: DateTime<Utc>) -> String {
    instant.timestamp().to_string()
}

fn from_unix(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok().and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn to_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

fn from_iso(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Flatten a [`Job`] into the field/value pairs written by `HSET`.
pub fn job_to_hash_fields(job: &Job) -> Vec<(String, String)> {
    vec![
        ("Id".to_string(), job.id.to_string()),
        ("Name".to_string(), job.name.clone()),
        ("StatusCode".to_string(), job.status.code().to_string()),
        ("HeadersJson".to_string(), serde_json::to_string(&job.headers).unwrap_or_default()),
        (
            "RouteParamsJson".to_string(),
            serde_json::to_string(&job.route_params).unwrap_or_default(),
        ),
        (
            "QueryParamsJson".to_string(),
            serde_json::to_string(&job.query_params).unwrap_or_default(),
        ),
        ("Payload".to_string(), job.payload.clone()),
        ("Result".to_string(), job.result.clone().unwrap_or_default()),
        (
            "ErrorJson".to_string(),
            job.error
                .as_ref()
                .and_then(|e| serde_json::to_string(e).ok())
                .unwrap_or_default(),
        ),
        ("RetryCount".to_string(), job.retry_count.to_string()),
        ("MaxRetries".to_string(), job.max_retries.to_string()),
        (
            "RetryDelayUntilUnix".to_string(),
            job.retry_delay_until.map(to_unix).unwrap_or_default(),
        ),
        ("WorkerId".to_string(), job.worker_id.map(|id| id.to_string()).unwrap_or_default()),
        ("CreatedAt".to_string(), to_iso(job.created_at)),
        ("StartedAt".to_string(), job.started_at.map(to_iso).unwrap_or_default()),
        ("StartedAtUnix".to_string(), job.started_at.map(to_unix).unwrap_or_default()),
        ("CompletedAt".to_string(), job.completed_at.map(to_iso).unwrap_or_default()),
        ("LastUpdatedAt".to_string(), to_iso(job.last_updated_at)),
    ]
}

/// Parse the field/value pairs `HGETALL` returns back into a [`Job`].
pub fn hash_fields_to_job(fields: &[(String, String)]) -> Result<Job> {
    let map: HashMap<&str, &str> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let get = |key: &str| -> Result<&str> { map.get(key).copied().context(format!("missing field {key}")) };

    let id: Uuid = get("Id")?.parse().context("invalid Id")?;
    let status_code: u16 = get("StatusCode")?.parse().context("invalid StatusCode")?;
    let status = JobStatus::from_code(status_code).context("unknown StatusCode")?;

    let headers = serde_json::from_str(get("HeadersJson").unwrap_or("{}")).unwrap_or_default();
    let route_params = serde_json::from_str(get("RouteParamsJson").unwrap_or("{}")).unwrap_or_default();
    let query_params = serde_json::from_str(get("QueryParamsJson").unwrap_or("[]")).unwrap_or_default();

    let result = map.get("Result").filter(|v| !v.is_empty()).map(|v| v.to_string());
    let error: Option<JobErrorRecord> = map
        .get("ErrorJson")
        .filter(|v| !v.is_empty())
        .and_then(|v| serde_json::from_str(v).ok());

    let worker_id = map
        .get("WorkerId")
        .filter(|v| !v.is_empty())
        .map(|v| v.parse())
        .transpose()
        .context("invalid WorkerId")?;

    Ok(Job::builder()
        .id(id)
        .name(get("Name")?.to_string())
        .status(status)
        .headers(headers)
        .route_params(route_params)
        .query_params(query_params)
        .payload(get("Payload")?.to_string())
        .maybe_result(result)
        .maybe_error(error)
        .retry_count(get("RetryCount")?.parse::<u32>().context("invalid RetryCount")?)
        .max_retries(get("MaxRetries")?.parse::<u32>().context("invalid MaxRetries")?)
        .maybe_retry_delay_until(from_unix(map.get("RetryDelayUntilUnix").copied().unwrap_or("")))
        .maybe_worker_id(worker_id)
        .created_at(from_iso(get("CreatedAt")?).context("invalid CreatedAt")?)
        .maybe_started_at(from_iso(map.get("StartedAt").copied().unwrap_or("")))
        .maybe_completed_at(from_iso(map.get("CompletedAt").copied().unwrap_or("")))
        .last_updated_at(from_iso(get("LastUpdatedAt")?).context("invalid LastUpdatedAt")?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_core::JobStatus;

    #[test]
    fn round_trips_a_fresh_job() {
        let now = Utc::now();
        let job = Job::builder()
            .name("echo")
            .payload("{\"v\":1}")
            .created_at(now)
            .last_updated_at(now)
            .build();

        let fields = job_to_hash_fields(&job);
        let decoded = hash_fields_to_job(&fields).unwrap();

        assert_eq!(decoded.id, job.id);
        assert_eq!(decoded.name, job.name);
        assert_eq!(decoded.status, JobStatus::Queued);
        assert_eq!(decoded.payload, job.payload);
        assert!(decoded.worker_id.is_none());
        assert_eq!(decoded.created_at.timestamp(), job.created_at.timestamp());
    }

    #[test]
    fn round_trips_an_in_progress_job_with_worker() {
        let now = Utc::now();
        let mut job = Job::builder()
            .name("echo")
            .payload("{}")
            .created_at(now)
            .last_updated_at(now)
            .build();
        job.status = JobStatus::InProgress;
        job.worker_id = Some(Uuid::new_v4());
        job.started_at = Some(now);

        let decoded = hash_fields_to_job(&job_to_hash_fields(&job)).unwrap();
        assert_eq!(decoded.status, JobStatus::InProgress);
        assert_eq!(decoded.worker_id, job.worker_id);
        assert_eq!(decoded.started_at.unwrap().timestamp(), now.timestamp());
    }

    #[test]
    fn round_trips_error_and_result_fields() {
        let now = Utc::now();
        let mut job = Job::builder()
            .name("flaky")
            .payload("{}")
            .created_at(now)
            .last_updated_at(now)
            .build();
        job.error = Some(JobErrorRecord::new("E", "boom").with_exception("trace"));
        job.result = Some("\"ok\"".to_string());

        let decoded = hash_fields_to_job(&job_to_hash_fields(&job)).unwrap();
        assert_eq!(decoded.result.as_deref(), Some("\"ok\""));
        let error = decoded.error.unwrap();
        assert_eq!(error.code, "E");
        assert_eq!(error.exception.as_deref(), Some("trace"));
    }

    #[test]
    fn timestamps_are_written_as_iso_8601_with_a_unix_duplicate_for_started_at() {
        let now = Utc::now();
        let mut job = Job::builder()
            .name("echo")
            .payload("{}")
            .created_at(now)
            .last_updated_at(now)
            .build();
        job.started_at = Some(now);

        let fields = job_to_hash_fields(&job);
        let map: HashMap<&str, &str> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        assert!(DateTime::parse_from_rfc3339(map["CreatedAt"]).is_ok());
        assert!(DateTime::parse_from_rfc3339(map["StartedAt"]).is_ok());
        assert!(DateTime::parse_from_rfc3339(map["LastUpdatedAt"]).is_ok());
        assert_eq!(map["StartedAtUnix"].parse::<i64>().unwrap(), now.timestamp());
    }
}
