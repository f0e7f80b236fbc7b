//! Bounded retry with exponential backoff and quota detection.
//!
//! [`RetryPolicy`] wraps every backend call made by the pipeline: photo
//! analysis, narrative generation, and each illustration. Failures are
//! sorted by [`classify`] into a closed set of [`ErrorKind`]s:
//!
//! - [`ErrorKind::Quota`] aborts immediately with [`StoryError::QuotaExceeded`].
//! - [`ErrorKind::Fatal`] aborts immediately with the original error.
//! - [`ErrorKind::Transient`] sleeps `base_delay * 2^attempt` and tries again,
//!   ending in [`StoryError::ExhaustedRetries`] once attempts run out. A
//!   provider `Retry-After` hint raises the sleep to at least that long.

use crate::error::{Result, StoryError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Type alias for the callback invoked before each backoff sleep.
///
/// Arguments: `(next_attempt_number, delay_before_retry, reason_for_retry)`.
pub type RetryCallback<'a> = Option<&'a mut (dyn FnMut(u32, Duration, &str) + Send)>;

/// How a failed backend call should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate or usage limit hit. Never retried.
    Quota,
    /// Worth another attempt.
    Transient,
    /// Retrying cannot help.
    Fatal,
}

/// Returns `true` if the message carries a quota/rate-limit signature:
/// the substring `"429"`, or `"quota"` in any letter case.
pub fn has_quota_signature(message: &str) -> bool {
    message.contains("429") || message.to_ascii_lowercase().contains("quota")
}

/// Map a raw error onto an [`ErrorKind`].
///
/// Quota detection works on the rendered error text, so a provider error
/// whose body or status mentions `429`/`quota` is caught regardless of
/// which variant carried it. Output-shape failures are produced locally from
/// model content, never by the provider, and are always transient.
pub fn classify(error: &StoryError) -> ErrorKind {
    match error {
        StoryError::QuotaExceeded(_) => ErrorKind::Quota,
        StoryError::Unavailable | StoryError::InvalidConfig(_) => ErrorKind::Fatal,
        StoryError::MalformedOutput(_) | StoryError::NoImageData => ErrorKind::Transient,
        other if has_quota_signature(&other.to_string()) => ErrorKind::Quota,
        _ => ErrorKind::Transient,
    }
}

/// Jitter applied on top of the exponential delay.
///
/// # Example
///
/// ```
/// use storybook_pipeline::retry::JitterStrategy;
///
/// assert_eq!(JitterStrategy::parse("Full"), Some(JitterStrategy::Full));
/// assert_eq!(JitterStrategy::parse("sometimes"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// No jitter. Delay is exactly the calculated value.
    None,

    /// Full jitter: random value in `[0, calculated_delay]`.
    Full,

    /// Equal jitter: `calculated_delay/2 + random in [0, calculated_delay/2]`.
    Equal,
}

impl JitterStrategy {
    /// Parse `none`, `full`, or `equal` (any letter case).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(JitterStrategy::None),
            "full" => Some(JitterStrategy::Full),
            "equal" => Some(JitterStrategy::Equal),
            _ => None,
        }
    }
}

/// Retry configuration shared by every backend call site.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use storybook_pipeline::retry::RetryPolicy;
///
/// let policy = RetryPolicy::standard();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,

    /// Delay before the second attempt. Default: 2 seconds.
    pub base_delay: Duration,

    /// Multiplier applied per attempt. Default: 2.0.
    pub multiplier: f64,

    /// Upper bound on a single delay. Default: 60 seconds.
    pub max_delay: Duration,

    /// Jitter strategy. Default: None.
    pub jitter: JitterStrategy,

    /// Treat a provider `Retry-After` hint as the minimum delay, capped at
    /// `max_delay`. Default: `true`.
    pub respect_retry_after: bool,
}

impl RetryPolicy {
    /// Policy with `max_attempts` and `base_delay`; other fields from [`standard`](Self::standard).
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::standard()
        }
    }

    /// 3 attempts, 2s base delay, doubling, no jitter.
    pub fn standard() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::None,
            respect_retry_after: true,
        }
    }

    /// A single attempt, never sleeps.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::standard()
        }
    }

    /// Set the jitter strategy.
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Ignore or honor provider `Retry-After` hints.
    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Cap individual delays.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Calculate the delay after failed attempt N (0-indexed).
    ///
    /// The base value is `base_delay * multiplier^attempt`, capped at
    /// `max_delay`, then jittered according to the configured strategy.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };

        Duration::from_secs_f64(jittered)
    }

    /// Delay before the retry that follows failed attempt N, given the
    /// provider's `Retry-After` hint (if any).
    fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        match retry_after {
            Some(hint) if self.respect_retry_after => delay.max(hint.min(self.max_delay)),
            _ => delay,
        }
    }

    /// Run `op` under this policy. See [`with_retry`].
    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(self, operation, None, op).await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Execute `op` with bounded retry and exponential backoff.
///
/// `op` receives the 0-indexed attempt number. Sleeps go through
/// `tokio::time::sleep`, so backoff only parks the current task.
///
/// # Arguments
///
/// * `policy`: Attempt budget and delay schedule
/// * `operation`: Label used in logs and in [`StoryError::ExhaustedRetries`]
/// * `on_retry`: Optional callback invoked before each sleep with (attempt, delay, reason)
/// * `op`: The fallible operation
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut on_retry: RetryCallback<'_>,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();
    let mut retry_after = None;

    for attempt in 0..attempts {
        debug!(operation, attempt = attempt + 1, max_attempts = attempts, "attempting");

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match classify(&err) {
            ErrorKind::Quota => {
                warn!(operation, attempt = attempt + 1, error = %err, "quota exceeded or rate limited");
                if matches!(err, StoryError::QuotaExceeded(_)) {
                    return Err(err);
                }
                return Err(StoryError::QuotaExceeded(err.to_string()));
            }
            ErrorKind::Fatal => {
                warn!(operation, error = %err, "non-retryable failure");
                return Err(err);
            }
            ErrorKind::Transient => {
                warn!(operation, attempt = attempt + 1, max_attempts = attempts, error = %err, "attempt failed");
                retry_after = match &err {
                    StoryError::HttpError { retry_after, .. } => *retry_after,
                    _ => None,
                };
                last_error = err.to_string();
            }
        }

        if attempt + 1 < attempts {
            let delay = policy.backoff_delay(attempt, retry_after);
            if let Some(ref mut cb) = on_retry {
                cb(attempt + 1, delay, &last_error);
            }
            info!(operation, delay_ms = delay.as_millis() as u64, "retrying after backoff");
            tokio::time::sleep(delay).await;
        }
    }

    Err(StoryError::ExhaustedRetries {
        operation: operation.to_string(),
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_exponential() {
        let policy = RetryPolicy::standard();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1)).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(9), Duration::from_secs(5));
    }

    #[test]
    fn test_full_jitter_in_range() {
        let policy = RetryPolicy::standard().with_jitter(JitterStrategy::Full);
        for _ in 0..100 {
            let d = policy.delay_for_attempt(0);
            assert!(d <= Duration::from_secs(2), "delay {:?} > 2s", d);
        }
    }

    #[test]
    fn test_quota_signature_matching() {
        assert!(has_quota_signature("HTTP 429: Too Many Requests"));
        assert!(has_quota_signature("Resource has been exhausted (check QUOTA)"));
        assert!(has_quota_signature("quota exceeded"));
        assert!(!has_quota_signature("HTTP 503: overloaded"));
    }

    #[test]
    fn test_classify() {
        let rate_limited = StoryError::HttpError {
            status: 429,
            body: "slow down".into(),
            retry_after: None,
        };
        assert_eq!(classify(&rate_limited), ErrorKind::Quota);
        assert_eq!(classify(&StoryError::Other("Quota reached".into())), ErrorKind::Quota);
        assert_eq!(classify(&StoryError::Unavailable), ErrorKind::Fatal);
        assert_eq!(classify(&StoryError::NoImageData), ErrorKind::Transient);
        assert_eq!(
            classify(&StoryError::MalformedOutput("expected value".into())),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_model_text_never_reads_as_quota() {
        let malformed = StoryError::MalformedOutput("Mia counted 1429 stars and ran out of quota".into());
        assert_eq!(classify(&malformed), ErrorKind::Transient);
    }

    #[test]
    fn test_jitter_parse() {
        assert_eq!(JitterStrategy::parse("none"), Some(JitterStrategy::None));
        assert_eq!(JitterStrategy::parse("EQUAL"), Some(JitterStrategy::Equal));
        assert_eq!(JitterStrategy::parse(""), None);
    }

    #[test]
    fn test_equal_jitter_in_range() {
        let policy = RetryPolicy::standard().with_jitter(JitterStrategy::Equal);
        for _ in 0..100 {
            let d = policy.delay_for_attempt(0);
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(2), "delay {:?}", d);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_raises_delay() {
        let policy = RetryPolicy::new(2, Duration::from_secs(2));
        let mut delays = Vec::new();
        let mut record = |_: u32, delay: Duration, _: &str| delays.push(delay);

        let result = with_retry(&policy, "overloaded", Some(&mut record), |attempt| async move {
            if attempt == 0 {
                Err(StoryError::HttpError {
                    status: 503,
                    body: "overloaded".into(),
                    retry_after: Some(Duration::from_secs(30)),
                })
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(delays, vec![Duration::from_secs(30)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_ignored_when_disabled_or_short() {
        let hinted = |secs| StoryError::HttpError {
            status: 503,
            body: "overloaded".into(),
            retry_after: Some(Duration::from_secs(secs)),
        };

        for (policy, hint) in [
            (RetryPolicy::new(2, Duration::from_secs(2)).with_respect_retry_after(false), 30),
            (RetryPolicy::new(2, Duration::from_secs(2)), 1),
        ] {
            let mut delays = Vec::new();
            let mut record = |_: u32, delay: Duration, _: &str| delays.push(delay);
            let result: Result<()> =
                with_retry(&policy, "overloaded", Some(&mut record), move |_| async move { Err(hinted(hint)) })
                    .await;
            assert!(matches!(result, Err(StoryError::ExhaustedRetries { .. })));
            assert_eq!(delays, vec![Duration::from_secs(2)]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_failures_with_doubling_sleeps() {
        let policy = RetryPolicy::standard();
        let mut delays = Vec::new();
        let mut record = |_attempt: u32, delay: Duration, _reason: &str| delays.push(delay);

        let result = with_retry(&policy, "flaky", Some(&mut record), |attempt| async move {
            if attempt < 2 {
                Err(StoryError::Other("connection reset".into()))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(delays, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn test_quota_fails_fast() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let mut sleeps = 0;
        let mut record = |_: u32, _: Duration, _: &str| sleeps += 1;

        let result: Result<()> = with_retry(&policy, "quota", Some(&mut record), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoryError::Other("RESOURCE_EXHAUSTED: Quota exceeded".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoryError::QuotaExceeded(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sleeps, 0);
    }

    #[tokio::test]
    async fn test_exhausted_carries_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("always-fails", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(StoryError::Other(format!("boom {}", attempt))) }
            })
            .await;

        match result {
            Err(StoryError::ExhaustedRetries {
                operation,
                attempts,
                last_error,
            }) => {
                assert_eq!(operation, "always-fails");
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "boom 2");
            }
            other => panic!("expected ExhaustedRetries, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("unavailable", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoryError::Unavailable) }
            })
            .await;

        assert!(matches!(result, Err(StoryError::Unavailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        let value = tokio_test::assert_ok!(policy.run("once", |_| async { Ok::<_, StoryError>(7) }).await);
        assert_eq!(value, 7);
    }
}
