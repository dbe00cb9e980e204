//! Exponential-backoff retry for provider calls.

use std::future::Future;
use std::time::Duration;

use prospector_shared::{PipelineConfig, Result};
use tracing::warn;

use crate::limiter::RateLimiter;

/// Retry configuration wrapping any fallible provider call.
///
/// Only errors whose [`is_retryable`](prospector_shared::ProspectorError::is_retryable)
/// is true are retried; everything else returns immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl From<&PipelineConfig> for RetryPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            initial_backoff: config.retry_initial_backoff,
            ..Self::default()
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying provider call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like [`run`](Self::run), spacing every attempt through `limiter`.
    pub async fn run_limited<T, F, Fut>(
        &self,
        limiter: &RateLimiter,
        label: &str,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(label, || {
            let call = op();
            async move {
                limiter.acquire().await;
                call.await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use prospector_shared::ProspectorError;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn backoff_doubles() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
        assert_eq!(p.backoff(3), Duration::from_secs(4));
        assert_eq!(p.backoff(20), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = policy()
            .run("test", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(ProspectorError::from_status("serper", 503, "busy"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProspectorError::RateLimited {
                    provider: "serper".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(ProspectorError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProspectorError::from_status("anymailfinder", 401, "bad key"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn limited_attempts_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let p = RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            ..policy()
        };
        let result: Result<()> = p
            .run_limited(&limiter, "test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProspectorError::Network("reset".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Three limited calls need at least two full intervals.
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
