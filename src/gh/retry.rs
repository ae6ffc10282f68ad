//! Bounded exponential backoff around remote calls.
//!
//! Every attempt's error is matched against a fixed list of transient markers.
//! Anything else is returned straight away so a bad token or a missing repo
//! does not cost four round-trips.

use super::error::GhError;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Substrings (matched case-insensitively) that mark an error as worth retrying.
const RETRYABLE_PATTERNS: &[&str] = &[
    "502",
    "503",
    "504",
    "429",
    "timeout",
    "connection refused",
    "network is unreachable",
    "temporary failure",
    "service unavailable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub fn is_retryable(message: &str) -> bool {
    let text = message.to_lowercase();
    RETRYABLE_PATTERNS.iter().any(|p| text.contains(p))
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, GhError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GhError>>,
{
    let mut attempt = 0;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err.to_string()) {
            return Err(err);
        }
        if attempt >= policy.max_retries {
            return Err(GhError::RetriesExhausted {
                retries: policy.max_retries,
                source: Box::new(err),
            });
        }

        let delay = policy.delay_for(attempt);
        tracing::debug!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            error = %err,
            "retrying remote call"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gh::error::{classify, ApiError, ErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn transient() -> GhError {
        classify(ApiError::new("gh: Service Unavailable (HTTP 503)"))
    }

    // --- Delay schedule ---

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for(40), Duration::from_secs(30));
    }

    // --- Pattern matching ---

    #[test]
    fn retryable_patterns_ignore_case() {
        assert!(is_retryable("Connection Refused"));
        assert!(is_retryable("SERVICE UNAVAILABLE"));
        assert!(is_retryable("HTTP 429"));
        assert!(is_retryable("Temporary failure in name resolution"));
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!is_retryable("HTTP 401: Bad credentials"));
        assert!(!is_retryable("HTTP 404: Not Found"));
    }

    // --- Attempt counting ---

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_is_called_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), GhError> = retry_with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(classify(ApiError::new("HTTP 404"))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn exhausting_retries_reports_count() {
        let calls = AtomicU32::new(0);
        let result: Result<(), GhError> = retry_with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("failed after 3 retries"), "{message}");
        assert!(message.contains("503"));
    }

    #[tokio::test]
    async fn zero_retries_wraps_first_failure() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..fast_policy()
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), GhError> = retry_with_backoff(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GhError::RetriesExhausted { retries: 0, .. })));
    }
}
