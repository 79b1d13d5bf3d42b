use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use super::client::LlmError;

/// Errors that may carry a service-provided retry delay (seconds)
pub trait RetryHint {
    fn retry_hint(&self) -> Option<f64> {
        None
    }
}

impl RetryHint for LlmError {
    fn retry_hint(&self) -> Option<f64> {
        self.retry_after()
    }
}

impl RetryHint for anyhow::Error {
    fn retry_hint(&self) -> Option<f64> {
        self.downcast_ref::<LlmError>().and_then(LlmError::retry_after)
    }
}

/// How long to wait between attempts and when to give up
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries until the operation succeeds
    pub max_attempts: Option<u32>,
    /// Delay used when the failure carries no hint
    pub default_delay: Duration,
    /// Added on top of a service-provided hint
    pub hint_padding: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::extraction()
    }
}

impl RetryPolicy {
    /// Policy for extraction service calls: unbounded, honours retry hints
    pub fn extraction() -> Self {
        Self {
            max_attempts: None,
            default_delay: Duration::from_millis(2000),
            hint_padding: Duration::from_millis(1500),
        }
    }

    /// Unbounded constant-delay policy, used around store operations
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            default_delay: delay,
            hint_padding: Duration::ZERO,
        }
    }

    /// A policy that never sleeps, for tests and dry runs
    pub fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Delay before the next attempt.
    ///
    /// With a hint of `s` seconds this is `ceil(s * 1000)` ms plus the padding;
    /// without one (or with a nonsensical one) it is the default delay.
    pub fn delay_for(&self, hint_secs: Option<f64>) -> Duration {
        match hint_secs {
            Some(secs) if secs.is_finite() && secs >= 0.0 => {
                Duration::from_millis((secs * 1000.0).ceil() as u64) + self.hint_padding
            }
            _ => self.default_delay,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: RetryHint + Display + Into<anyhow::Error>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{}: succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        let err: anyhow::Error = e.into();
                        return Err(
                            err.context(format!("{}: giving up after {} attempts", label, attempt))
                        );
                    }

                    let delay = self.delay_for(e.retry_hint());
                    warn!(
                        "{}: attempt {} failed ({}), retrying in {}ms",
                        label,
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Parse a retry delay such as `"2.5s"` or `"30"` into seconds
pub fn parse_retry_delay(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('s').unwrap_or(trimmed).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_with_hint() {
        let policy = RetryPolicy::extraction();
        let hint = parse_retry_delay("2.5s");
        assert_eq!(hint, Some(2.5));
        assert_eq!(policy.delay_for(hint), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_rounds_hint_up() {
        let policy = RetryPolicy::extraction();
        assert_eq!(policy.delay_for(Some(0.0004)), Duration::from_millis(1501));
    }

    #[test]
    fn test_delay_without_hint() {
        let policy = RetryPolicy::extraction();
        assert_eq!(policy.delay_for(None), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(Some(f64::NAN)), Duration::from_millis(2000));
    }

    #[test]
    fn test_fixed_policy_ignores_padding() {
        let policy = RetryPolicy::fixed(Duration::from_millis(1000));
        assert_eq!(policy.delay_for(None), Duration::from_millis(1000));
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn test_parse_retry_delay() {
        assert_eq!(parse_retry_delay("30"), Some(30.0));
        assert_eq!(parse_retry_delay(" 1.25s "), Some(1.25));
        assert_eq!(parse_retry_delay("soon"), None);
        assert_eq!(parse_retry_delay("-1"), None);
    }

    #[test]
    fn test_anyhow_error_exposes_hint() {
        let err: anyhow::Error = LlmError::RateLimited {
            retry_after: Some(3.0),
            message: "quota".into(),
        }
        .into();
        assert_eq!(err.retry_hint(), Some(3.0));
        assert_eq!(anyhow::anyhow!("db locked").retry_hint(), None);
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::immediate();

        let value = policy
            .run("flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(LlmError::EmptyContent)
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_gives_up_when_bounded() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::immediate().with_max_attempts(2);

        let result: Result<()> = policy
            .run("always failing", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("store unavailable"))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("giving up after 2 attempts"));
    }
}
