//! Exponential backoff shared between the processor's failure path and
//! the recovery scan, so the two call sites can never drift apart (they
//! must agree on the same post-increment formula).
//!
//! Grounded on `kernel::jobs::queue::PostgresJobQueue`'s
//! `2i64.pow(retry_count).min(3600)` backoff, generalized to take the
//! base seconds as a parameter instead of hardcoding `1`.

use chrono::{DateTime, Duration, Utc};

/// Ceiling on the computed delay (an hour) so a misconfigured
/// base/retry_count can't schedule a job arbitrarily far into the future.
const MAX_DELAY_SECONDS: u64 = 3600;

/// Seconds to wait before the next attempt, given the retry count *after*
/// incrementing for this failure: `2^retry_count * base`, clamped to
/// [`MAX_DELAY_SECONDS`].
pub fn backoff_seconds(retry_count_after_increment: u32, retry_base_seconds: u64) -> u64 {
    let factor = 1u64.checked_shl(retry_count_after_increment).unwrap_or(u64::MAX);
    factor
        .saturating_mul(retry_base_seconds)
        .min(MAX_DELAY_SECONDS)
}

/// `now + backoff_seconds(...)`, the instant a retried job becomes eligible.
pub fn retry_delay_until(
    now: DateTime<Utc>,
    retry_count_after_increment: u32,
    retry_base_seconds: u64,
) -> DateTime<Utc> {
    now + Duration::seconds(backoff_seconds(retry_count_after_increment, retry_base_seconds) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_retry() {
        assert_eq!(backoff_seconds(1, 1), 2);
        assert_eq!(backoff_seconds(2, 1), 4);
        assert_eq!(backoff_seconds(3, 1), 8);
    }

    #[test]
    fn backoff_scales_with_base() {
        assert_eq!(backoff_seconds(1, 5), 10);
        assert_eq!(backoff_seconds(3, 5), 40);
    }

    #[test]
    fn backoff_clamps_to_one_hour() {
        assert_eq!(backoff_seconds(20, 10), MAX_DELAY_SECONDS);
    }

    #[test]
    fn retry_delay_until_adds_backoff_to_now() {
        let now = Utc::now();
        let until = retry_delay_until(now, 2, 1);
        assert_eq!(until, now + Duration::seconds(4));
    }
}
