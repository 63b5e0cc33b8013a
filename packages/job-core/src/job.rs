//! The [`Job`] aggregate and its wire-stable status codes.
//!
//! A job is a durable record of one unit of deferred work. It is never
//! mutated in place by callers of this crate — stores replace the full
//! record (or specific fields) atomically and hand back fresh snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Status of a job, numbered in the on-wire-stable scheme from the design doc.
///
/// The gaps between codes (100, 200, 300, ...) leave room for future
/// intermediate states without renumbering existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum JobStatus {
    Queued,
    Scheduled,
    InProgress,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    /// The stable numeric code for this status.
    pub fn code(self) -> u16 {
        match self {
            JobStatus::Queued => 100,
            JobStatus::Scheduled => 200,
            JobStatus::InProgress => 300,
            JobStatus::Completed => 400,
            JobStatus::Failed => 500,
            JobStatus::Canceled => 600,
        }
    }

    /// Recover a status from its numeric code, if it names one.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            100 => Some(JobStatus::Queued),
            200 => Some(JobStatus::Scheduled),
            300 => Some(JobStatus::InProgress),
            400 => Some(JobStatus::Completed),
            500 => Some(JobStatus::Failed),
            600 => Some(JobStatus::Canceled),
            _ => None,
        }
    }

    /// Whether this status is terminal: no further transitions are legal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Whether a job in this status is a candidate for claiming (subject to
    /// the worker/retry-delay checks in the eligibility predicate).
    pub fn is_claimable_status(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Scheduled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Scheduled => "Scheduled",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// Structured error recorded on a job after a failed attempt.
///
/// `exception` carries an optional nested description for errors that
/// originated from a handler panic or an underlying exception-shaped
/// failure, kept separate from `message` so callers can distinguish
/// "the handler told us this" from "we caught this ourselves".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrorRecord {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exception: Option<String>,
}

impl JobErrorRecord {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            exception: None,
        }
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }
}

/// A unit of deferred work, persisted by a [`crate::store::JobStore`].
///
/// Headers and query params preserve duplicate keys and order, matching
/// how they arrived on the HTTP request that created the job.
/// Route params are opaque JSON values, since the core never interprets
/// them — only the handler registered for `name` does.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub name: String,

    #[builder(default = JobStatus::Queued)]
    pub status: JobStatus,

    #[builder(default)]
    pub headers: HashMap<String, Vec<Option<String>>>,

    #[builder(default)]
    pub route_params: HashMap<String, serde_json::Value>,

    #[builder(default)]
    pub query_params: Vec<(String, Vec<String>)>,

    pub payload: String,

    #[builder(default, setter(strip_option))]
    pub result: Option<String>,

    #[builder(default, setter(strip_option))]
    pub error: Option<JobErrorRecord>,

    #[builder(default = 0)]
    pub retry_count: u32,

    #[builder(default = 3)]
    pub max_retries: u32,

    #[builder(default, setter(strip_option))]
    pub retry_delay_until: Option<DateTime<Utc>>,

    #[builder(default, setter(strip_option))]
    pub worker_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    #[builder(default, setter(strip_option))]
    pub started_at: Option<DateTime<Utc>>,

    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,

    pub last_updated_at: DateTime<Utc>,
}

impl Job {
    /// The score used by a store's ready index: `max(retry_delay_until, created_at)`
    /// as seconds-since-epoch.
    pub fn ready_score(&self) -> i64 {
        let created = self.created_at.timestamp();
        match self.retry_delay_until {
            Some(until) => created.max(until.timestamp()),
            None => created,
        }
    }

    /// The eligibility predicate, evaluated against `now`: unclaimed, in a
    /// claimable status, and not delayed past `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.worker_id.is_none()
            && self.status.is_claimable_status()
            && match self.retry_delay_until {
                Some(until) => until <= now,
                None => true,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Scheduled,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Canceled,
        ] {
            assert_eq!(JobStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(JobStatus::from_code(999), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
    }

    fn sample_job(now: DateTime<Utc>) -> Job {
        Job::builder()
            .name("echo")
            .payload("{}")
            .created_at(now)
            .last_updated_at(now)
            .build()
    }

    #[test]
    fn fresh_queued_job_is_claimable() {
        let now = Utc::now();
        let job = sample_job(now);
        assert!(job.is_claimable(now));
    }

    #[test]
    fn job_with_worker_is_not_claimable() {
        let now = Utc::now();
        let mut job = sample_job(now);
        job.worker_id = Some(Uuid::new_v4());
        job.status = JobStatus::InProgress;
        assert!(!job.is_claimable(now));
    }

    #[test]
    fn job_with_future_retry_delay_is_not_claimable() {
        let now = Utc::now();
        let mut job = sample_job(now);
        job.status = JobStatus::Scheduled;
        job.retry_delay_until = Some(now + chrono::Duration::seconds(30));
        assert!(!job.is_claimable(now));
        assert!(job.is_claimable(now + chrono::Duration::seconds(31)));
    }

    #[test]
    fn ready_score_prefers_retry_delay_when_later() {
        let now = Utc::now();
        let mut job = sample_job(now);
        job.retry_delay_until = Some(now + chrono::Duration::seconds(60));
        assert_eq!(job.ready_score(), (now + chrono::Duration::seconds(60)).timestamp());
    }
}
