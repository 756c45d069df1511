//! Retry and backoff policy for remote calls.
//!
//! The request executor drives a small state machine: every attempt produces an
//! [`AttemptOutcome`], [`RetryPolicy::decide`] maps it to a [`RetryDecision`],
//! and the executor acts on the decision. Re-authentication is allowed once per
//! logical call; transport, 429 and 5xx retries share an independent budget.

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// Delay policy: server hint when present, exponential jitter otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Base delay; also the upper bound of the random jitter.
    pub base: Duration,
    /// Cap applied to every delay, hinted or computed.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Creates a new backoff policy.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before the retry following `attempt` (1-based).
    pub fn delay(&self, attempt: u32, server_hint: Option<&str>) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.0..=self.base.as_secs_f64());
        self.delay_with_jitter(attempt, server_hint, jitter, Utc::now())
    }

    /// Deterministic core of [`BackoffPolicy::delay`].
    pub fn delay_with_jitter(
        &self,
        attempt: u32,
        server_hint: Option<&str>,
        jitter_secs: f64,
        now: DateTime<Utc>,
    ) -> Duration {
        if let Some(hinted) = server_hint.and_then(|hint| parse_retry_after(hint, now)) {
            return hinted.min(self.max);
        }

        let exponent = attempt.saturating_sub(1).min(62) as i32;
        let computed = self.base.as_secs_f64() * 2f64.powi(exponent) + jitter_secs.max(0.0);
        let capped = computed.min(self.max.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }
}

/// Parses a `Retry-After` value: integer seconds or an HTTP-date.
///
/// Dates in the past and negative integers yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<i64>() {
        return Some(Duration::from_secs(secs.max(0) as u64));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let offset = date.with_timezone(&Utc) - now;
    Some(offset.to_std().unwrap_or(Duration::ZERO))
}

/// What a single attempt produced.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    /// Connection error, timeout or other transport-level failure.
    TransportFailure,
    /// A response arrived.
    Response {
        /// Response status.
        status: StatusCode,
        /// `Retry-After` header, if any.
        retry_after: Option<&'a str>,
    },
}

/// What the executor does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then try again with the next attempt number.
    Retry(Duration),
    /// Re-authenticate, then repeat the request once with fresh headers.
    ReauthenticateAndRetry,
    /// Hand the response to the caller as-is.
    Return,
    /// Propagate the transport failure.
    Fail,
}

/// Per-call bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Whether re-authentication already ran for this call.
    pub reauthenticated: bool,
}

impl RetryState {
    /// State of the first attempt.
    pub fn new() -> Self {
        Self {
            attempt: 1,
            reauthenticated: false,
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed for retryable failures.
    pub max_retries: u32,
    /// Delay policy between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Maps the outcome of an attempt to the next step.
    pub fn decide(&self, state: &RetryState, outcome: &AttemptOutcome<'_>) -> RetryDecision {
        match *outcome {
            AttemptOutcome::TransportFailure => {
                if state.attempt >= self.max_retries {
                    RetryDecision::Fail
                } else {
                    RetryDecision::Retry(self.backoff.delay(state.attempt, None))
                }
            }
            AttemptOutcome::Response { status, .. } if status == StatusCode::UNAUTHORIZED => {
                if state.reauthenticated {
                    RetryDecision::Return
                } else {
                    RetryDecision::ReauthenticateAndRetry
                }
            }
            AttemptOutcome::Response {
                status,
                retry_after,
            } if is_retryable_status(status) => {
                if state.attempt >= self.max_retries {
                    RetryDecision::Return
                } else {
                    RetryDecision::Retry(self.backoff.delay(state.attempt, retry_after))
                }
            }
            AttemptOutcome::Response { .. } => RetryDecision::Return,
        }
    }
}

/// 429 and every 5xx are retried.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy(base_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()
    }

    #[test]
    fn test_backoff_policy_default() {
        let backoff = BackoffPolicy::default();
        assert_eq!(backoff.base, Duration::from_millis(500));
        assert_eq!(backoff.max, Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_without_jitter() {
        let backoff = policy(1000, 60_000);
        let now = fixed_now();

        assert_eq!(backoff.delay_with_jitter(1, None, 0.0, now), Duration::from_secs(1));
        assert_eq!(backoff.delay_with_jitter(2, None, 0.0, now), Duration::from_secs(2));
        assert_eq!(backoff.delay_with_jitter(3, None, 0.0, now), Duration::from_secs(4));
    }

    #[test]
    fn test_exponential_is_capped() {
        let backoff = policy(1000, 10_000);
        let delay = backoff.delay_with_jitter(40, None, 0.9, fixed_now());
        assert_eq!(delay, Duration::from_secs(10));

        let delay = backoff.delay_with_jitter(u32::MAX, None, 0.0, fixed_now());
        assert_eq!(delay, Duration::from_secs(10));
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let backoff = policy(100, 10_000);
        for _ in 0..50 {
            let delay = backoff.delay(2, None);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(301));
        }
    }

    #[test]
    fn test_integer_hint_used_verbatim() {
        let backoff = policy(1000, 60_000);
        let delay = backoff.delay_with_jitter(3, Some("7"), 0.5, fixed_now());
        assert_eq!(delay, Duration::from_secs(7));
    }

    #[test]
    fn test_hint_is_clamped_to_cap() {
        let backoff = policy(1000, 10_000);
        let delay = backoff.delay_with_jitter(1, Some("120"), 0.0, fixed_now());
        assert_eq!(delay, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_hint_means_immediate_retry() {
        let backoff = policy(1000, 10_000);
        assert_eq!(
            backoff.delay_with_jitter(1, Some("0"), 0.5, fixed_now()),
            Duration::ZERO
        );
    }

    #[test]
    fn test_unparseable_hint_falls_back_to_exponential() {
        let backoff = policy(1000, 60_000);
        let delay = backoff.delay_with_jitter(2, Some("soon"), 0.0, fixed_now());
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_retry_after_values() {
        let now = fixed_now();
        assert_eq!(parse_retry_after("5", now), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 12 ", now), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("-3", now), Some(Duration::ZERO));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("", now), None);
        assert_eq!(parse_retry_after("later", now), None);
    }

    #[test]
    fn test_decide_transport_failure() {
        let retry = RetryPolicy::new(3, policy(0, 0));

        let state = RetryState {
            attempt: 1,
            reauthenticated: false,
        };
        assert!(matches!(
            retry.decide(&state, &AttemptOutcome::TransportFailure),
            RetryDecision::Retry(_)
        ));

        let state = RetryState {
            attempt: 3,
            reauthenticated: false,
        };
        assert_eq!(
            retry.decide(&state, &AttemptOutcome::TransportFailure),
            RetryDecision::Fail
        );
    }

    #[test]
    fn test_decide_unauthorized_once() {
        let retry = RetryPolicy::new(3, policy(0, 0));
        let outcome = AttemptOutcome::Response {
            status: StatusCode::UNAUTHORIZED,
            retry_after: None,
        };

        let state = RetryState::new();
        assert_eq!(
            retry.decide(&state, &outcome),
            RetryDecision::ReauthenticateAndRetry
        );

        let state = RetryState {
            attempt: 1,
            reauthenticated: true,
        };
        assert_eq!(retry.decide(&state, &outcome), RetryDecision::Return);
    }

    #[test]
    fn test_decide_rate_limit_and_server_errors() {
        let retry = RetryPolicy::new(2, policy(0, 0));

        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let outcome = AttemptOutcome::Response {
                status,
                retry_after: Some("0"),
            };
            assert_eq!(
                retry.decide(&RetryState::new(), &outcome),
                RetryDecision::Retry(Duration::ZERO)
            );
            let exhausted = RetryState {
                attempt: 2,
                reauthenticated: false,
            };
            assert_eq!(retry.decide(&exhausted, &outcome), RetryDecision::Return);
        }
    }

    #[test]
    fn test_decide_other_statuses_return() {
        let retry = RetryPolicy::new(3, policy(0, 0));
        for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::FORBIDDEN] {
            let outcome = AttemptOutcome::Response {
                status,
                retry_after: None,
            };
            assert_eq!(retry.decide(&RetryState::new(), &outcome), RetryDecision::Return);
        }
    }
}
