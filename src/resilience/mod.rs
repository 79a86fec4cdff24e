use crate::config::settings::{Settings, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY};
use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Upper bound on a single wait, so large attempt counts cannot overflow.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Retry behaviour resolved from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
    pub exponential_backoff: bool,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
            exponential_backoff: true,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            retries: settings.retries.unwrap_or(defaults.retries),
            delay: settings.retry_delay.unwrap_or(defaults.delay),
            exponential_backoff: settings
                .exponential_backoff
                .unwrap_or(defaults.exponential_backoff),
            jitter: settings.jitter.unwrap_or(defaults.jitter),
        }
    }

    /// Total number of attempts: the first one plus every retry.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Wait before the retry that follows zero-based attempt `attempt`.
///
/// With backoff the base delay is scaled by `e^attempt`, so the first retry
/// waits the base delay. Jitter then picks uniformly in `[0, delay)`.
#[must_use]
pub fn calculate_retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let mut delay = policy.delay.min(MAX_RETRY_DELAY);
    if policy.exponential_backoff {
        let factor = f64::from(attempt.min(64)).exp();
        delay = Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
            .map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY));
    }
    if policy.jitter {
        delay = delay.mul_f64(fastrand::f64());
    }
    delay
}

/// What is left after the attempt budget is spent or a response is accepted.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Most recent response received, accepted or not.
    pub response: Option<T>,
    /// Error of the final attempt, if it failed.
    pub error: Option<Error>,
    pub attempts: u32,
}

/// Runs `operation` until it yields a response with a status below 500 or
/// the attempt budget runs out.
///
/// Transport errors and 5xx responses are retried. The caller decides what
/// to make of the outcome.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
    status_of: impl Fn(&T) -> u16,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let attempts = policy.attempts();
    let mut response = None;
    let mut error = None;

    for attempt in 0..attempts {
        match operation(attempt).await {
            Ok(result) => {
                let status = status_of(&result);
                if status < 500 {
                    return RetryOutcome {
                        response: Some(result),
                        error: None,
                        attempts: attempt + 1,
                    };
                }
                tracing::warn!(attempt = attempt + 1, attempts, status, "server error");
                response = Some(result);
                error = None;
            }
            Err(e) => {
                tracing::warn!(attempt = attempt + 1, attempts, error = %e, "request failed");
                error = Some(e);
            }
        }

        if attempt + 1 < attempts {
            let delay = calculate_retry_delay(policy, attempt);
            tracing::info!(
                attempt = attempt + 1,
                attempts,
                delay_ms = delay.as_millis(),
                "retrying"
            );
            sleep(delay).await;
        }
    }

    RetryOutcome {
        response,
        error,
        attempts,
    }
}
