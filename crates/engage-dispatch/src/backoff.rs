//! Retry & backoff manager (C5).
//!
//! Pure logic: given a failed send's retry count and the channel it failed
//! on, decides whether another attempt is warranted and when it should run.

use chrono::{DateTime, Duration, Utc};
use engage_schemas::Channel;

use crate::types::DispatchError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base backoff interval for a channel. Email gets a longer base than call
/// and LinkedIn, matching provider-side throttling expectations.
pub fn base_interval(channel: Channel) -> Duration {
    match channel {
        Channel::Email => Duration::minutes(2),
        Channel::Call | Channel::Linkedin => Duration::minutes(1),
    }
}

/// `now + base * 2^retry_count`.
pub fn next_schedule(now: DateTime<Utc>, channel: Channel, retry_count: u32) -> DateTime<Utc> {
    let factor = 2i64.saturating_pow(retry_count);
    now + base_interval(channel) * factor as i32
}

/// Whether a failed send should be retried at all.
///
/// `false` once `retry_count` has reached `max_retries`, or when the error
/// is classified as non-retryable regardless of remaining budget.
pub fn should_retry(error: &DispatchError, retry_count: u32, max_retries: u32) -> bool {
    error.is_retryable() && retry_count < max_retries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_base_interval_is_two_minutes() {
        assert_eq!(base_interval(Channel::Email), Duration::minutes(2));
    }

    #[test]
    fn call_and_linkedin_base_interval_is_one_minute() {
        assert_eq!(base_interval(Channel::Call), Duration::minutes(1));
        assert_eq!(base_interval(Channel::Linkedin), Duration::minutes(1));
    }

    #[test]
    fn schedule_doubles_each_retry() {
        let now = Utc::now();
        let s0 = next_schedule(now, Channel::Call, 0);
        let s1 = next_schedule(now, Channel::Call, 1);
        let s2 = next_schedule(now, Channel::Call, 2);
        assert_eq!(s0 - now, Duration::minutes(1));
        assert_eq!(s1 - now, Duration::minutes(2));
        assert_eq!(s2 - now, Duration::minutes(4));
    }

    #[test]
    fn transient_error_is_retried_until_max_retries() {
        let err = DispatchError::Transient("timeout".into());
        assert!(should_retry(&err, 0, DEFAULT_MAX_RETRIES));
        assert!(should_retry(&err, 2, DEFAULT_MAX_RETRIES));
        assert!(!should_retry(&err, 3, DEFAULT_MAX_RETRIES));
    }

    #[test]
    fn permanent_delivery_error_never_retried() {
        let err = DispatchError::PermanentDelivery("hard bounce".into());
        assert!(!should_retry(&err, 0, DEFAULT_MAX_RETRIES));
    }

    #[test]
    fn authentication_and_data_integrity_errors_never_retried() {
        assert!(!should_retry(
            &DispatchError::Authentication("bad key".into()),
            0,
            DEFAULT_MAX_RETRIES
        ));
        assert!(!should_retry(
            &DispatchError::DataIntegrity("missing lead".into()),
            0,
            DEFAULT_MAX_RETRIES
        ));
    }
}
