//! Bounded retry with a per-attempt timeout around outbound provider calls.
//!
//! Every attempt is wrapped in `tokio::time::timeout`; failed attempts are
//! retried after a fixed delay until `max_retries` is exhausted. Errors that
//! cannot be fixed by calling again (missing configuration) return at once.

use connector_config::RetryConfig;
use connector_core::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.delay_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no delay.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            timeout,
        }
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "{provider} did not answer within {}ms",
                    self.timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        provider,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn defaults_follow_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay, Duration::from_millis(300));
        assert_eq!(policy.timeout, Duration::from_secs(130));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Mutex::new(0u32);
        let result = fast(2)
            .run("TEST", || {
                let n = {
                    let mut c = calls.lock().unwrap();
                    *c += 1;
                    *c
                };
                async move {
                    if n < 3 {
                        Err(ProviderError::Network("reset".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = Mutex::new(0u32);
        let result: Result<(), _> = fast(2)
            .run("TEST", || {
                *calls.lock().unwrap() += 1;
                async {
                    Err(ProviderError::ApiError {
                        status_code: 502,
                        message: "bad gateway".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::ApiError { status_code: 502, .. })));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn not_configured_is_not_retried() {
        let calls = Mutex::new(0u32);
        let result: Result<(), _> = fast(2)
            .run("TEST", || {
                *calls.lock().unwrap() += 1;
                async { Err(ProviderError::NotConfigured("key".into())) }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out() {
        let policy = RetryPolicy::no_retry(Duration::from_secs(1));
        let result: Result<(), _> = policy
            .run("SLOW", || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        match result {
            Err(ProviderError::Timeout(msg)) => assert!(msg.contains("SLOW")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
